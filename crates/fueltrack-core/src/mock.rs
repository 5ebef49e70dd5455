//! Mock price source for testing.
//!
//! [`MockFetcher`] implements [`Fetcher`] without touching the network, so
//! the fetch pipeline and its callers can be exercised in unit tests.
//!
//! # Features
//!
//! - **Per-station prices**: Answer with a fixed price for a given station key
//! - **Failure injection**: Fail every call, or only a given number of calls
//! - **Fixed clock**: Stamp readings with a known timestamp

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use fueltrack_types::{PriceReading, StationTarget, timestamp};

use crate::error::{FetchError, Result};
use crate::traits::Fetcher;

/// A price source with scripted answers.
///
/// # Example
///
/// ```
/// use fueltrack_core::{Fetcher, MockFetcher};
/// use fueltrack_types::{StationConfig, StationTarget};
/// use rust_decimal::Decimal;
///
/// #[tokio::main]
/// async fn main() {
///     let fetcher = MockFetcher::new(Decimal::new(1859, 3));
///     let target = StationTarget::new("92400", StationConfig::new("RELAIS"));
///     let reading = fetcher.fetch(&target).await.unwrap();
///     assert_eq!(reading.price, Decimal::new(1859, 3));
/// }
/// ```
pub struct MockFetcher {
    default_price: RwLock<Decimal>,
    prices: RwLock<HashMap<String, Decimal>>,
    fixed_time: RwLock<Option<OffsetDateTime>>,
    fetch_count: AtomicU32,
    should_fail: AtomicBool,
    fail_message: RwLock<String>,
    /// Number of calls still to fail before succeeding.
    remaining_failures: AtomicU32,
}

impl std::fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFetcher")
            .field("fetch_count", &self.fetch_count.load(Ordering::Relaxed))
            .field("should_fail", &self.should_fail.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new(Decimal::new(1859, 3))
    }
}

impl MockFetcher {
    /// Create a mock answering `default_price` for every station.
    pub fn new(default_price: Decimal) -> Self {
        Self {
            default_price: RwLock::new(default_price),
            prices: RwLock::new(HashMap::new()),
            fixed_time: RwLock::new(None),
            fetch_count: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
            fail_message: RwLock::new("Mock failure".to_string()),
            remaining_failures: AtomicU32::new(0),
        }
    }

    /// Answer `price` for the station with this key.
    pub async fn set_price(&self, station_key: impl Into<String>, price: Decimal) {
        self.prices.write().await.insert(station_key.into(), price);
    }

    /// Change the price used for stations without a scripted one.
    pub async fn set_default_price(&self, price: Decimal) {
        *self.default_price.write().await = price;
    }

    /// Stamp every reading with `at` instead of the current time.
    pub async fn set_time(&self, at: OffsetDateTime) {
        *self.fixed_time.write().await = Some(at);
    }

    /// Make every call fail with `message`, or stop failing.
    pub async fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message {
            *self.fail_message.write().await = msg.to_string();
        }
    }

    /// Fail the next `count` calls with a retryable status error.
    pub fn fail_next(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Number of fetch calls so far, failed ones included.
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, target: &StationTarget) -> Result<PriceReading> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(FetchError::Other(self.fail_message.read().await.clone()));
        }

        let remaining = self.remaining_failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.remaining_failures
                .store(remaining - 1, Ordering::Relaxed);
            return Err(FetchError::Status {
                status: 503,
                url: format!("mock://{}", target.postal_code),
            });
        }

        let key = target.station_key();
        let price = match self.prices.read().await.get(&key) {
            Some(price) => *price,
            None => *self.default_price.read().await,
        };
        let at = self.fixed_time.read().await.unwrap_or_else(timestamp::now);

        Ok(target.reading(price, at))
    }
}
