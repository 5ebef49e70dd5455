//! Dashboard queries over a loaded snapshot.
//!
//! Every function here is pure: it takes the readings as loaded and a
//! [`Selection`] of station keys, and keeps no state between calls.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use fueltrack_types::PriceReading;

/// Which stations a query covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Every station present in the snapshot.
    #[default]
    All,
    /// Only these station keys. An empty set selects nothing.
    Only(BTreeSet<String>),
}

impl Selection {
    /// Build a selection from a list of station keys.
    pub fn only<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Only(keys.into_iter().map(Into::into).collect())
    }

    pub fn none() -> Self {
        Selection::Only(BTreeSet::new())
    }

    pub fn contains(&self, station_key: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(keys) => keys.contains(station_key),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Only(keys) if keys.is_empty())
    }
}

/// One selectable station as it appears in the history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct StationSummary {
    pub station_key: String,
    pub postal_code: String,
    pub fuel_type: String,
}

/// Summary figures for the selected stations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    /// Price of the most recent selected reading.
    pub current_price: Option<Decimal>,
    /// Most recent price per station key.
    pub current_prices: BTreeMap<String, Decimal>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
    pub total_records: usize,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

fn selected<'a>(
    readings: &'a [PriceReading],
    selection: &'a Selection,
) -> impl Iterator<Item = &'a PriceReading> + 'a {
    readings
        .iter()
        .filter(move |r| selection.contains(&r.station_key))
}

/// Distinct `(station, postal code, fuel)` triples, sorted.
pub fn list_stations(readings: &[PriceReading]) -> Vec<StationSummary> {
    readings
        .iter()
        .map(|r| StationSummary {
            station_key: r.station_key.clone(),
            postal_code: r.postal_code.clone(),
            fuel_type: r.fuel_type.clone(),
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Selected readings grouped by station key, each group oldest first.
pub fn filtered_series(
    readings: &[PriceReading],
    selection: &Selection,
) -> BTreeMap<String, Vec<PriceReading>> {
    let mut series: BTreeMap<String, Vec<PriceReading>> = BTreeMap::new();
    for reading in selected(readings, selection) {
        series
            .entry(reading.station_key.clone())
            .or_default()
            .push(reading.clone());
    }
    for group in series.values_mut() {
        // Stable: equal timestamps keep sequence order.
        group.sort_by_key(|r| r.timestamp);
    }
    series
}

/// Current price, last update and price range over the selected readings.
pub fn statistics(readings: &[PriceReading], selection: &Selection) -> Statistics {
    let mut latest: Option<&PriceReading> = None;
    let mut latest_per_station: BTreeMap<&str, &PriceReading> = BTreeMap::new();
    let mut total_records = 0;
    let mut min_price: Option<Decimal> = None;
    let mut max_price: Option<Decimal> = None;

    for reading in selected(readings, selection) {
        total_records += 1;
        min_price = Some(min_price.map_or(reading.price, |m| m.min(reading.price)));
        max_price = Some(max_price.map_or(reading.price, |m| m.max(reading.price)));

        // `>=` so that later entries win ties.
        if latest.is_none_or(|l| reading.timestamp >= l.timestamp) {
            latest = Some(reading);
        }
        let slot = latest_per_station
            .entry(reading.station_key.as_str())
            .or_insert(reading);
        if reading.timestamp >= slot.timestamp {
            *slot = reading;
        }
    }

    Statistics {
        current_price: latest.map(|r| r.price),
        current_prices: latest_per_station
            .into_iter()
            .map(|(key, r)| (key.to_string(), r.price))
            .collect(),
        last_updated: latest.map(|r| r.timestamp),
        total_records,
        min_price,
        max_price,
    }
}

/// Selected readings, newest first.
pub fn recent_first(readings: &[PriceReading], selection: &Selection) -> Vec<PriceReading> {
    let mut rows: Vec<PriceReading> = selected(readings, selection).cloned().collect();
    // Reverse first so the stable sort puts later entries ahead on ties.
    rows.reverse();
    rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    rows
}
