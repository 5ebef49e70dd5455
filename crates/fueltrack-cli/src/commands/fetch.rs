//! Fetch command implementation.

use std::process::ExitCode;

use anyhow::{Context as _, Result, bail};

use fueltrack_core::WebFetcher;
use fueltrack_store::JsonStore;
use fueltrack_types::StationTarget;

use crate::cli::FetchArgs;
use crate::fetch::{StationResult, fetch_all};

use super::Context;

pub async fn cmd_fetch(ctx: &Context, args: &FetchArgs) -> Result<ExitCode> {
    let config = &ctx.config;
    let targets = select_targets(config.stations.targets(), args.postal.as_deref())?;

    let fetcher = WebFetcher::new(config.fetcher.clone()).context("Invalid fetcher settings")?;
    let mut store = if args.dry_run {
        None
    } else {
        Some(JsonStore::open(&config.storage.path)?)
    };

    let report = fetch_all(
        &fetcher,
        &targets,
        &config.retry,
        &config.fetcher.bounds,
        store.as_mut(),
    )
    .await?;

    for (target, result) in &report.results {
        match result {
            StationResult::Stored { reading, .. } => {
                println!("ok      {target}: {} €/L", reading.price)
            }
            StationResult::Fetched { reading } => {
                println!("dry-run {target}: {} €/L", reading.price)
            }
            StationResult::Failed { error } => println!("failed  {target}: {error}"),
        }
    }

    if report.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!(
            "{} of {} station(s) failed",
            report.failures(),
            report.results.len()
        );
        Ok(ExitCode::FAILURE)
    }
}

fn select_targets(targets: Vec<StationTarget>, postal: Option<&str>) -> Result<Vec<StationTarget>> {
    let Some(postal) = postal else {
        return Ok(targets);
    };
    let selected: Vec<_> = targets
        .into_iter()
        .filter(|t| t.postal_code == postal)
        .collect();
    if selected.is_empty() {
        bail!("No stations configured for postal code {postal}");
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fueltrack_types::StationConfig;

    fn targets() -> Vec<StationTarget> {
        vec![
            StationTarget::new("92400", StationConfig::new("RELAIS")),
            StationTarget::new("75001", StationConfig::new("ESSO")),
        ]
    }

    #[test]
    fn test_select_all_targets() {
        assert_eq!(select_targets(targets(), None).unwrap().len(), 2);
    }

    #[test]
    fn test_select_by_postal_code() {
        let selected = select_targets(targets(), Some("75001")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].station.name, "ESSO");
    }

    #[test]
    fn test_unknown_postal_code() {
        let err = select_targets(targets(), Some("13001")).unwrap_err();
        assert!(err.to_string().contains("13001"));
    }
}
