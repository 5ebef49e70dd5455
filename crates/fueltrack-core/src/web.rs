//! Fetcher backed by the public price-comparison site.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fueltrack_types::{PriceReading, StationTarget, timestamp};

use crate::error::{FetchError, Result};
use crate::extract::extract_price;
use crate::traits::Fetcher;
use crate::validation::PriceBounds;

/// Placeholder replaced by the postal code in [`WebFetcherConfig::search_url`].
pub const POSTAL_PLACEHOLDER: &str = "{postal}";

/// Settings for [`WebFetcher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebFetcherConfig {
    /// Search page URL; `{postal}` is replaced with the station's postal code.
    pub search_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Plausible price range; candidates outside it are ignored.
    pub bounds: PriceBounds,
}

impl Default for WebFetcherConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.prix-carburants.gouv.fr/recherche/?code_postal={postal}"
                .to_string(),
            timeout_secs: 20,
            user_agent: concat!("fueltrack/", env!("CARGO_PKG_VERSION")).to_string(),
            bounds: PriceBounds::default(),
        }
    }
}

impl WebFetcherConfig {
    /// Build the search URL for one postal code.
    pub fn url_for(&self, postal_code: &str) -> String {
        self.search_url.replace(POSTAL_PLACEHOLDER, postal_code)
    }
}

/// Scrapes the price-comparison site, one request per station.
#[derive(Debug, Clone)]
pub struct WebFetcher {
    client: reqwest::Client,
    config: WebFetcherConfig,
}

impl WebFetcher {
    /// Create a fetcher; fails if the URL template or bounds are unusable.
    pub fn new(config: WebFetcherConfig) -> Result<Self> {
        if !config.search_url.contains(POSTAL_PLACEHOLDER) {
            return Err(FetchError::InvalidConfig(format!(
                "search_url must contain {POSTAL_PLACEHOLDER}"
            )));
        }
        if !config.bounds.is_valid() {
            return Err(FetchError::InvalidConfig(format!(
                "price bounds ({}, {}) are not a valid range",
                config.bounds.min, config.bounds.max
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &WebFetcherConfig {
        &self.config
    }

    async fn fetch_page(&self, postal_code: &str) -> Result<String> {
        let url = self.config.url_for(postal_code);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Fetcher for WebFetcher {
    fn name(&self) -> &str {
        "web"
    }

    async fn fetch(&self, target: &StationTarget) -> Result<PriceReading> {
        let html = self.fetch_page(&target.postal_code).await?;
        let price = extract_price(&html, target, &self.config.bounds)?;
        let reading = target.reading(price, timestamp::now());

        info!("{}: {} €/L", target, reading.price);
        Ok(reading)
    }
}
