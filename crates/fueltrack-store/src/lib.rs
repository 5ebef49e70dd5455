//! Daily price history persistence and queries.
//!
//! This crate keeps the price history as a single JSON document holding at
//! most one reading per station, fuel and calendar day, and answers the
//! dashboard's queries over it.
//!
//! # Features
//!
//! - Same-day readings replace each other in place; new days are appended
//! - Atomic whole-document writes (temporary file, fsync, rename)
//! - An advisory lock serializing concurrent writers
//! - Absent or damaged documents read as empty instead of failing
//! - Station listing, per-station series and summary statistics
//!
//! # Example
//!
//! ```no_run
//! use fueltrack_store::{JsonStore, PriceStore, Selection, aggregate};
//!
//! let store = JsonStore::open_default()?;
//! let snapshot = store.load_all();
//!
//! let stats = aggregate::statistics(&snapshot.readings, &Selection::All);
//! println!("{} records, latest {:?}", stats.total_records, stats.current_price);
//! # Ok::<(), fueltrack_store::Error>(())
//! ```

pub mod aggregate;
mod error;
mod store;

pub use aggregate::{Selection, StationSummary, Statistics};
pub use error::{Error, Result};
pub use store::{JsonStore, PriceStore, Snapshot, SnapshotSource, UpsertOutcome, WriteGuard};

/// Default price history path following platform conventions.
///
/// - Linux: `~/.local/share/fueltrack/prices.json`
/// - macOS: `~/Library/Application Support/fueltrack/prices.json`
/// - Windows: `C:\Users\<user>\AppData\Local\fueltrack\prices.json`
pub fn default_store_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("fueltrack")
        .join("prices.json")
}
