//! Command implementations for the CLI.

mod fetch;
mod restart;
mod serve;
mod start;
mod status;
mod stop;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::{debug, warn};

use fueltrack_service::{Config, default_config_path};

use crate::process::SystemProcesses;
use crate::supervisor::{HealthProbe, HttpHealthProbe, Supervisor};

pub use fetch::cmd_fetch;
pub use restart::cmd_restart;
pub use serve::cmd_serve;
pub use start::cmd_start;
pub use status::cmd_status;
pub use stop::cmd_stop;

/// Validated configuration together with the file it came from.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
}

impl Context {
    /// Load and validate the configuration at `path`, or at the default
    /// location when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };
        let config_path = std::path::absolute(&path)
            .with_context(|| format!("Invalid config path {}", path.display()))?;

        debug!("Loading configuration from {}", config_path.display());
        let config = Config::load_validated(&config_path)?;
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Supervisor for the real server process.
    pub fn supervisor(&self) -> Result<Supervisor<SystemProcesses>> {
        let processes = SystemProcesses::new(Some(self.config_path.as_path()))
            .context("Failed to locate the fueltrack executable")?;

        let health = if self.config.supervisor.health_check {
            match self.config.server.health_url() {
                Some(url) => Some(Box::new(HttpHealthProbe::new(url)?) as Box<dyn HealthProbe>),
                None => {
                    warn!("No health URL for {}, checking liveness only", self.config.server.bind);
                    None
                }
            }
        } else {
            None
        };

        Ok(Supervisor::new(
            self.config.supervisor.clone(),
            self.config.storage.path.clone(),
            processes,
            health,
        ))
    }
}
