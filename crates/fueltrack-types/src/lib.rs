//! Shared types for fuel price tracking.
//!
//! This crate provides the data model shared by the store, the fetcher,
//! the HTTP service and the command-line tool.
//!
//! # Features
//!
//! - [`PriceReading`]: one timestamped price observation
//! - [`StationCatalog`] and [`StationConfig`]: the tracked universe
//! - [`StationTarget`]: a single station to fetch
//! - Timestamp helpers tolerant of legacy documents
//!
//! # Example
//!
//! ```
//! use fueltrack_types::{StationConfig, StationTarget};
//! use rust_decimal::Decimal;
//! use time::OffsetDateTime;
//!
//! let target = StationTarget::new("92400", StationConfig::new("RELAIS DU PARC"));
//! let reading = target.reading(Decimal::new(1859, 3), OffsetDateTime::now_utc());
//! assert_eq!(reading.fuel_type, "SP98");
//! assert_eq!(reading.location_label, "92400");
//! ```

pub mod error;
pub mod timestamp;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    DEFAULT_FUEL, PriceReading, ReadingIdentity, StationCatalog, StationConfig, StationTarget,
    parse_price,
};

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    fn sample_reading() -> PriceReading {
        PriceReading {
            timestamp: datetime!(2025-01-01 09:00:00 +01:00),
            price: dec!(1.859),
            fuel_type: "SP98".to_string(),
            postal_code: "92400".to_string(),
            station_key: "RELAIS DU PARC".to_string(),
            location_label: "Courbevoie".to_string(),
        }
    }

    // --- PriceReading tests ---

    #[test]
    fn test_identity_same_day_matches() {
        let morning = sample_reading();
        let mut evening = sample_reading();
        evening.timestamp = datetime!(2025-01-01 21:45:00 +01:00);
        evening.price = dec!(1.899);

        assert_eq!(morning.identity(), evening.identity());
    }

    #[test]
    fn test_identity_differs_by_day_fuel_and_station() {
        let base = sample_reading();

        let mut next_day = sample_reading();
        next_day.timestamp = datetime!(2025-01-02 09:00:00 +01:00);
        assert_ne!(base.identity(), next_day.identity());

        let mut other_fuel = sample_reading();
        other_fuel.fuel_type = "E10".to_string();
        assert_ne!(base.identity(), other_fuel.identity());

        let mut other_station = sample_reading();
        other_station.station_key = "AUCHAN".to_string();
        assert_ne!(base.identity(), other_station.identity());
    }

    #[test]
    fn test_date_uses_stored_offset() {
        let mut reading = sample_reading();
        // Still the 1st of January in UTC.
        reading.timestamp = datetime!(2025-01-02 00:30:00 +01:00);
        assert_eq!(reading.date(), time::macros::date!(2025 - 01 - 02));
    }

    // --- Serialization tests ---

    #[test]
    fn test_reading_serialization() {
        let json = serde_json::to_string(&sample_reading()).unwrap();
        assert!(json.contains("\"timestamp\":\"2025-01-01T09:00:00+01:00\""));
        assert!(json.contains("\"price\":1.859"));
        assert!(json.contains("\"station_key\":\"RELAIS DU PARC\""));
    }

    #[test]
    fn test_reading_roundtrip() {
        let reading = sample_reading();
        let json = serde_json::to_string(&reading).unwrap();
        let back: PriceReading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_legacy_reading_deserialization() {
        let json = r#"{
            "date": "2025-01-01T10:12:44.513201",
            "price": 1.899,
            "fuel": "SP98",
            "postal": "92400",
            "station": "RELAIS DU PARC",
            "location": "Courbevoie"
        }"#;

        let reading: PriceReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.price, dec!(1.899));
        assert_eq!(reading.station_key, "RELAIS DU PARC");
        assert_eq!(reading.postal_code, "92400");
        assert_eq!(reading.date(), time::macros::date!(2025 - 01 - 01));
    }

    #[test]
    fn test_reading_without_location_defaults_empty() {
        let json = r#"{"timestamp":"2025-01-01T09:00:00Z","price":1.8,"fuel_type":"E10",
            "postal_code":"75001","station_key":"X"}"#;
        let reading: PriceReading = serde_json::from_str(json).unwrap();
        assert!(reading.location_label.is_empty());
    }

    // --- Catalog tests ---

    #[test]
    fn test_station_config_defaults() {
        let station: StationConfig = serde_json::from_str(r#"{"name":"RELAIS"}"#).unwrap();
        assert_eq!(station.fuel, DEFAULT_FUEL);
        assert!(station.brand.is_none());
        assert_eq!(station.station_key(), "RELAIS");
    }

    #[test]
    fn test_station_key_ignores_blank_brand() {
        let station = StationConfig::new(" RELAIS ").brand("  ");
        assert_eq!(station.station_key(), "RELAIS");
    }

    #[test]
    fn test_catalog_targets_in_order() {
        let mut catalog = StationCatalog::new();
        catalog.insert("92400", StationConfig::new("B"));
        catalog.insert("75001", StationConfig::new("A").fuel("E10"));
        catalog.insert("92400", StationConfig::new("C"));

        assert_eq!(catalog.postal_code_count(), 2);
        assert_eq!(catalog.station_count(), 3);

        let targets = catalog.targets();
        let keys: Vec<_> = targets
            .iter()
            .map(|t| (t.postal_code.as_str(), t.station_key()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("75001", "A".to_string()),
                ("92400", "B".to_string()),
                ("92400", "C".to_string()),
            ]
        );
    }

    #[test]
    fn test_target_reading_uses_catalog_fields() {
        let mut station = StationConfig::new("RELAIS").brand("Total").fuel("Gazole");
        station.location = Some("Courbevoie".to_string());
        let target = StationTarget::new("92400", station);

        let reading = target.reading(dec!(1.745), datetime!(2025-02-01 08:00 UTC));
        assert_eq!(reading.station_key, "RELAIS | Total");
        assert_eq!(reading.fuel_type, "Gazole");
        assert_eq!(reading.location_label, "Courbevoie");
        assert_eq!(target.to_string(), "RELAIS | Total (Gazole, 92400)");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1.859").unwrap(), dec!(1.859));
        assert_eq!(parse_price(" 1,859 ").unwrap(), dec!(1.859));
        assert!(parse_price("n/a").is_err());
    }
}
