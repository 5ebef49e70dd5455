//! Configuration and HTTP dashboard API for fueltrack.
//!
//! This crate provides:
//! - The [`Config`] shared by every fueltrack component
//! - A read-only REST API over the price history
//! - A single-page dashboard served at `/`
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Liveness check used by the supervisor
//! - `GET /api/status` - Record count, store state and uptime
//! - `GET /api/stations` - Distinct stations in the history
//! - `GET /api/series?stations=a&stations=b` - Per-station readings, oldest first
//! - `GET /api/statistics?stations=a&stations=b` - Current, minimum and maximum price
//! - `GET /api/readings?stations=a&stations=b&limit=n` - Readings, newest first
//!
//! # Configuration
//!
//! The configuration is read from `~/.config/fueltrack/config.toml` unless
//! `FUELTRACK_CONFIG` or `--config` points elsewhere:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:9000"
//!
//! [storage]
//! path = "prices.json"
//!
//! [supervisor]
//! startup_grace_secs = 3
//!
//! [fetcher]
//! search_url = "https://www.prix-carburants.gouv.fr/recherche/?code_postal={postal}"
//!
//! [stations]
//! "92400" = [
//!     { name = "RELAIS DU PARC", brand = "TotalEnergies" },
//!     { name = "AUCHAN", fuel = "E10" },
//! ]
//! ```

pub mod api;
pub mod config;
pub mod server;
pub mod state;

pub use config::{
    CONFIG_ENV, Config, ConfigError, ServerConfig, StorageConfig, SupervisorConfig,
    ValidationError, default_config_path,
};
pub use server::{ServeError, app, serve};
pub use state::AppState;
