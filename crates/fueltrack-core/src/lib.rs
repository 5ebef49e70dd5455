//! Price fetching for tracked fuel stations.
//!
//! This crate turns a [`StationTarget`](fueltrack_types::StationTarget)
//! into a [`PriceReading`](fueltrack_types::PriceReading) or an error.
//! It never writes anything; persisting a successful reading is the
//! caller's job.
//!
//! # Features
//!
//! - **Pluggable sources**: the [`Fetcher`] trait, with a scraping
//!   [`WebFetcher`] and a scriptable [`MockFetcher`]
//! - **Plausibility checks**: [`PriceBounds`] rejects implausible values
//! - **Retries**: [`with_retry`] retries transient network failures with backoff
//!
//! # Quick Start
//!
//! ```no_run
//! use fueltrack_core::{Fetcher, WebFetcher, WebFetcherConfig};
//! use fueltrack_types::{StationConfig, StationTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = WebFetcher::new(WebFetcherConfig::default())?;
//!     let target = StationTarget::new("92400", StationConfig::new("RELAIS DU PARC"));
//!
//!     let reading = fetcher.fetch(&target).await?;
//!     println!("{}: {}", reading.station_key, reading.price);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod extract;
pub mod mock;
pub mod retry;
pub mod traits;
pub mod validation;
pub mod web;

pub use error::{FetchError, Result};
pub use mock::MockFetcher;
pub use retry::{RetryConfig, with_retry};
pub use traits::Fetcher;
pub use validation::PriceBounds;
pub use web::{WebFetcher, WebFetcherConfig};
