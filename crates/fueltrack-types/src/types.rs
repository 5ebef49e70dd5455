//! Core types for fuel price data.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::error::{ParseError, ParseResult};

/// Fuel type used when a catalog entry does not name one.
pub const DEFAULT_FUEL: &str = "SP98";

/// One timestamped price observation for a station/fuel pair.
///
/// Field aliases accept documents written by the earlier tracker
/// (`date`, `fuel`, `postal`, `station`, `location`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReading {
    /// When the price was captured.
    #[serde(alias = "date", with = "crate::timestamp")]
    pub timestamp: OffsetDateTime,
    /// Price per litre.
    pub price: Decimal,
    /// Fuel grade, e.g. `SP98` or `Gazole`.
    #[serde(alias = "fuel")]
    pub fuel_type: String,
    /// Postal code the station was looked up under.
    #[serde(alias = "postal")]
    pub postal_code: String,
    /// Station identity (name and brand).
    #[serde(alias = "station")]
    pub station_key: String,
    /// Human-readable location.
    #[serde(alias = "location", default)]
    pub location_label: String,
}

impl PriceReading {
    /// Calendar date of the reading, in the reading's own offset.
    pub fn date(&self) -> Date {
        self.timestamp.date()
    }

    /// The daily-override identity of this reading.
    pub fn identity(&self) -> ReadingIdentity<'_> {
        ReadingIdentity {
            station_key: &self.station_key,
            fuel_type: &self.fuel_type,
            date: self.date(),
        }
    }
}

/// Identity used for deduplication: `(station_key, fuel_type, date)`.
///
/// At most one reading with a given identity is kept by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadingIdentity<'a> {
    pub station_key: &'a str,
    pub fuel_type: &'a str,
    pub date: Date,
}

/// A tracked station as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Station name as shown on the price site.
    pub name: String,
    /// Brand, appended to the name to build the station key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Fuel grade to track.
    #[serde(default = "default_fuel")]
    pub fuel: String,
    /// Location label for readings; defaults to the postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

fn default_fuel() -> String {
    DEFAULT_FUEL.to_string()
}

impl StationConfig {
    /// Create a catalog entry with the default fuel and no brand.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            brand: None,
            fuel: default_fuel(),
            location: None,
        }
    }

    /// Set the fuel grade.
    pub fn fuel(mut self, fuel: impl Into<String>) -> Self {
        self.fuel = fuel.into();
        self
    }

    /// Set the brand.
    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// The station key: `name`, or `name | brand` when a brand is set.
    ///
    /// # Examples
    ///
    /// ```
    /// use fueltrack_types::StationConfig;
    ///
    /// assert_eq!(StationConfig::new("RELAIS DU PARC").station_key(), "RELAIS DU PARC");
    /// assert_eq!(
    ///     StationConfig::new("RELAIS DU PARC").brand("TotalEnergies").station_key(),
    ///     "RELAIS DU PARC | TotalEnergies"
    /// );
    /// ```
    pub fn station_key(&self) -> String {
        match self.brand.as_deref().map(str::trim) {
            Some(brand) if !brand.is_empty() => format!("{} | {}", self.name.trim(), brand),
            _ => self.name.trim().to_string(),
        }
    }
}

/// The tracked universe: postal code to the stations listed under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationCatalog(BTreeMap<String, Vec<StationConfig>>);

impl StationCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a station under a postal code.
    pub fn insert(&mut self, postal_code: impl Into<String>, station: StationConfig) {
        self.0.entry(postal_code.into()).or_default().push(station);
    }

    /// Postal codes with their stations, in postal-code order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<StationConfig>)> {
        self.0.iter()
    }

    /// Number of postal codes.
    pub fn postal_code_count(&self) -> usize {
        self.0.len()
    }

    /// Total number of stations across all postal codes.
    pub fn station_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Whether the catalog lists no station at all.
    pub fn is_empty(&self) -> bool {
        self.station_count() == 0
    }

    /// Flatten into fetch targets, in catalog order.
    pub fn targets(&self) -> Vec<StationTarget> {
        self.0
            .iter()
            .flat_map(|(postal, stations)| {
                stations.iter().map(move |station| StationTarget {
                    postal_code: postal.clone(),
                    station: station.clone(),
                })
            })
            .collect()
    }
}

/// One catalog entry together with its postal code; the unit a fetcher works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationTarget {
    pub postal_code: String,
    pub station: StationConfig,
}

impl StationTarget {
    pub fn new(postal_code: impl Into<String>, station: StationConfig) -> Self {
        Self {
            postal_code: postal_code.into(),
            station,
        }
    }

    pub fn station_key(&self) -> String {
        self.station.station_key()
    }

    pub fn fuel_type(&self) -> &str {
        &self.station.fuel
    }

    pub fn location_label(&self) -> &str {
        self.station
            .location
            .as_deref()
            .unwrap_or(&self.postal_code)
    }

    /// Build a reading for this station.
    pub fn reading(&self, price: Decimal, timestamp: OffsetDateTime) -> PriceReading {
        PriceReading {
            timestamp,
            price,
            fuel_type: self.station.fuel.clone(),
            postal_code: self.postal_code.clone(),
            station_key: self.station_key(),
            location_label: self.location_label().to_string(),
        }
    }
}

impl std::fmt::Display for StationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.station_key(),
            self.station.fuel,
            self.postal_code
        )
    }
}

/// Parse a price as printed on a price board.
///
/// Accepts a decimal point or a decimal comma (`1.859`, `1,859`).
pub fn parse_price(raw: &str) -> ParseResult<Decimal> {
    let normalized = raw.trim().replace(',', ".");
    Decimal::from_str(&normalized).map_err(|_| ParseError::InvalidPrice(raw.to_string()))
}
