//! Application state shared across handlers.
//!
//! Handlers never cache price data: every request reads the document afresh
//! through [`PriceStore::load_all`](fueltrack_store::PriceStore::load_all),
//! so a fetch committed by another process shows up on the next request.

use std::sync::Arc;
use std::time::Instant;

use fueltrack_store::JsonStore;
use time::OffsetDateTime;

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// The price history.
    pub store: JsonStore,
    /// Configuration loaded at startup.
    pub config: Config,
    /// When the server started.
    pub started_at: OffsetDateTime,
    started: Instant,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: JsonStore, config: Config) -> Arc<Self> {
        Arc::new(Self {
            store,
            config,
            started_at: OffsetDateTime::now_utc(),
            started: Instant::now(),
        })
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
