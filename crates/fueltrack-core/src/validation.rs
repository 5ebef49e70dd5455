//! Plausibility bounds for fetched prices.
//!
//! Scraped pages contain many numbers that look like prices. Anything
//! outside the configured range is treated as a failed fetch rather than
//! clamped or stored.
//!
//! # Example
//!
//! ```
//! use fueltrack_core::PriceBounds;
//! use rust_decimal::Decimal;
//!
//! let bounds = PriceBounds::default();
//! assert!(bounds.contains(Decimal::new(1859, 3)));
//! assert!(!bounds.contains(Decimal::new(25, 1)));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fueltrack_types::PriceReading;

use crate::error::{FetchError, Result};

/// Exclusive price range accepted from a fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBounds {
    /// Prices must be strictly greater than this.
    pub min: Decimal,
    /// Prices must be strictly less than this.
    pub max: Decimal,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            min: Decimal::new(15, 1),
            max: Decimal::new(25, 1),
        }
    }
}

impl PriceBounds {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    /// Whether `price` lies strictly inside the range.
    pub fn contains(&self, price: Decimal) -> bool {
        self.min < price && price < self.max
    }

    /// Reject a reading whose price is outside the range.
    pub fn check(&self, reading: &PriceReading) -> Result<()> {
        if self.contains(reading.price) {
            Ok(())
        } else {
            Err(FetchError::OutOfBounds {
                station: reading.station_key.clone(),
                price: reading.price,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Whether the range is usable (`min < max`, both positive).
    pub fn is_valid(&self) -> bool {
        self.min >= Decimal::ZERO && self.min < self.max
    }
}
