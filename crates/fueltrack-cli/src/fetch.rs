//! The fetch pipeline: one reading per catalog station, stored on success.
//!
//! Each station is fetched with retries, checked against the price bounds
//! and committed under the store's write lock before the next station is
//! tried. A failed station never touches the store.

use fueltrack_core::{FetchError, Fetcher, PriceBounds, RetryConfig, with_retry};
use fueltrack_store::{JsonStore, UpsertOutcome};
use fueltrack_types::{PriceReading, StationTarget};
use tracing::{info, warn};

/// What happened to one station.
#[derive(Debug)]
pub enum StationResult {
    /// Fetched and committed.
    Stored {
        reading: PriceReading,
        outcome: UpsertOutcome,
    },
    /// Fetched only; nothing was written.
    Fetched { reading: PriceReading },
    Failed { error: FetchError },
}

/// Per-station results of a fetch run, in catalog order.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub results: Vec<(StationTarget, StationResult)>,
}

impl FetchReport {
    pub fn failures(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, StationResult::Failed { .. }))
            .count()
    }

    pub fn successes(&self) -> usize {
        self.results.len() - self.failures()
    }

    /// Whether every station succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures() == 0
    }
}

/// Fetch every target, committing each success to `store` when given.
///
/// Only store I/O errors abort the run; fetch failures are recorded in the
/// report and the remaining stations are still tried.
pub async fn fetch_all<F: Fetcher + ?Sized>(
    fetcher: &F,
    targets: &[StationTarget],
    retry: &RetryConfig,
    bounds: &PriceBounds,
    mut store: Option<&mut JsonStore>,
) -> Result<FetchReport, fueltrack_store::Error> {
    let mut report = FetchReport::default();
    info!(
        "Fetching {} station(s) from {}",
        targets.len(),
        fetcher.name()
    );

    for target in targets {
        let label = target.to_string();
        let fetched = with_retry(retry, &label, || fetcher.fetch(target))
            .await
            .and_then(|reading| bounds.check(&reading).map(|()| reading));

        let result = match fetched {
            Err(error) => {
                warn!("{}: {}", label, error);
                StationResult::Failed { error }
            }
            Ok(reading) => match store.as_deref_mut() {
                Some(store) => {
                    let mut guard = store.begin_write()?;
                    let outcome = guard.upsert(reading.clone());
                    guard.commit()?;
                    info!("{}: stored {} €/L", label, reading.price);
                    StationResult::Stored { reading, outcome }
                }
                None => StationResult::Fetched { reading },
            },
        };
        report.results.push((target.clone(), result));
    }

    info!(
        "Fetch complete: {} succeeded, {} failed",
        report.successes(),
        report.failures()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fueltrack_core::MockFetcher;
    use fueltrack_store::PriceStore;
    use fueltrack_types::StationConfig;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    fn targets() -> Vec<StationTarget> {
        vec![
            StationTarget::new("92400", StationConfig::new("RELAIS").brand("TOTAL")),
            StationTarget::new("92400", StationConfig::new("AUCHAN")),
        ]
    }

    fn temp_store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("prices.json")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_successful_fetch_stores_every_station() {
        let (_dir, mut store) = temp_store();
        let fetcher = MockFetcher::new(dec!(1.859));

        let report = fetch_all(
            &fetcher,
            &targets(),
            &RetryConfig::none(),
            &PriceBounds::default(),
            Some(&mut store),
        )
        .await
        .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.successes(), 2);
        assert_eq!(store.load_all().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_fetcher_leaves_store_unchanged() {
        let (_dir, mut store) = temp_store();
        let fetcher = MockFetcher::default();
        fetcher.set_time(datetime!(2025-01-01 08:00 UTC)).await;
        fetch_all(
            &fetcher,
            &targets()[..1],
            &RetryConfig::none(),
            &PriceBounds::default(),
            Some(&mut store),
        )
        .await
        .unwrap();
        let before = std::fs::read(store.path()).unwrap();

        fetcher.set_should_fail(true, Some("site down")).await;
        let report = fetch_all(
            &fetcher,
            &targets(),
            &RetryConfig::none(),
            &PriceBounds::default(),
            Some(&mut store),
        )
        .await
        .unwrap();

        assert_eq!(report.failures(), 2);
        assert!(!report.is_complete());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_out_of_bounds_price_is_rejected() {
        let (_dir, mut store) = temp_store();
        let fetcher = MockFetcher::new(dec!(1.859));
        fetcher.set_price("AUCHAN", dec!(0.199)).await;

        let report = fetch_all(
            &fetcher,
            &targets(),
            &RetryConfig::none(),
            &PriceBounds::default(),
            Some(&mut store),
        )
        .await
        .unwrap();

        assert_eq!(report.failures(), 1);
        let (target, result) = &report.results[1];
        assert_eq!(target.station_key(), "AUCHAN");
        assert!(matches!(
            result,
            StationResult::Failed {
                error: FetchError::OutOfBounds { .. }
            }
        ));

        let stored = store.load_all();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.readings[0].station_key, "RELAIS | TOTAL");
    }

    #[tokio::test]
    async fn test_rerun_same_day_keeps_one_record_per_station() {
        let (_dir, mut store) = temp_store();
        let fetcher = MockFetcher::new(dec!(1.80));
        fetcher.set_time(datetime!(2025-01-01 08:00 UTC)).await;

        for price in [dec!(1.80), dec!(1.85)] {
            fetcher.set_default_price(price).await;
            fetch_all(
                &fetcher,
                &targets(),
                &RetryConfig::none(),
                &PriceBounds::default(),
                Some(&mut store),
            )
            .await
            .unwrap();
        }

        let stored = store.load_all();
        assert_eq!(stored.len(), 2);
        assert!(stored.readings.iter().all(|r| r.price == dec!(1.85)));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let (_dir, store) = temp_store();
        let fetcher = MockFetcher::default();

        let report = fetch_all(
            &fetcher,
            &targets(),
            &RetryConfig::none(),
            &PriceBounds::default(),
            None,
        )
        .await
        .unwrap();

        assert!(report.is_complete());
        assert!(matches!(report.results[0].1, StationResult::Fetched { .. }));
        assert!(!store.path().exists());
    }
}
