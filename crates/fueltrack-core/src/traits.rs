//! Trait abstraction for price sources.
//!
//! This module provides the [`Fetcher`] trait that abstracts over the
//! real price site and mock sources for testing.

use async_trait::async_trait;

use fueltrack_types::{PriceReading, StationTarget};

use crate::error::Result;

/// A source of fuel prices.
///
/// One call produces exactly one reading for one station, or fails.
/// Implementations must never return a partial or placeholder reading:
/// when no price can be determined the call returns an error.
///
/// # Example
///
/// ```ignore
/// use fueltrack_core::{Fetcher, Result};
/// use fueltrack_types::StationTarget;
///
/// async fn print_price<F: Fetcher>(fetcher: &F, target: &StationTarget) -> Result<()> {
///     let reading = fetcher.fetch(target).await?;
///     println!("{}: {} €/L", reading.station_key, reading.price);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short name of the source, used in logs.
    fn name(&self) -> &str;

    /// Fetch the current price for one station.
    async fn fetch(&self, target: &StationTarget) -> Result<PriceReading>;
}
