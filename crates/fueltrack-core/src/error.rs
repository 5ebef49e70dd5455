//! Error types for fueltrack-core.
//!
//! # Retry Strategy
//!
//! | Error | Retry? | Rationale |
//! |-------|--------|-----------|
//! | [`FetchError::Http`] (timeout, connect) | Yes | Transient network trouble |
//! | [`FetchError::Status`] 5xx / 429 | Yes | Site overloaded or throttling |
//! | [`FetchError::Status`] other | No | Wrong URL or blocked |
//! | [`FetchError::StationNotFound`] | No | Catalog does not match the site |
//! | [`FetchError::PriceNotFound`] | No | Page layout changed |
//! | [`FetchError::OutOfBounds`] | No | Value is implausible, never stored |
//! | [`FetchError::InvalidConfig`] | No | Fix configuration and rerun |

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while fetching a price.
///
/// A fetch that ends in any of these never produces a reading, so the
/// store is left untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// HTTP transport error.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The price site answered with a non-success status.
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// The station name does not appear on the result page.
    #[error("Station '{0}' not found on the result page")]
    StationNotFound(String),

    /// The station was found but no plausible price could be extracted.
    #[error("No price found for station '{0}'")]
    PriceNotFound(String),

    /// The fetched price falls outside the accepted range.
    #[error("Price {price} for '{station}' is outside the accepted range ({min}, {max})")]
    OutOfBounds {
        station: String,
        price: Decimal,
        min: Decimal,
        max: Decimal,
    },

    /// Invalid fetcher configuration.
    #[error("Invalid fetcher configuration: {0}")]
    InvalidConfig(String),

    /// Failure reported by a fetcher that does not fit the other variants.
    #[error("Fetch failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Whether retrying the same fetch could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::StationNotFound(_)
            | FetchError::PriceNotFound(_)
            | FetchError::OutOfBounds { .. }
            | FetchError::InvalidConfig(_)
            | FetchError::Other(_) => false,
        }
    }
}

/// Result type for fueltrack-core operations.
pub type Result<T> = std::result::Result<T, FetchError>;
