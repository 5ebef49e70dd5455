//! Configuration loaded once at startup.
//!
//! Every component receives the same [`Config`] value; nothing reads
//! process-wide constants.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use fueltrack_core::{RetryConfig, WebFetcherConfig, web::POSTAL_PLACEHOLDER};
use fueltrack_types::StationCatalog;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "FUELTRACK_CONFIG";

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Price history location.
    pub storage: StorageConfig,
    /// Daemon management settings.
    pub supervisor: SupervisorConfig,
    /// Price site settings.
    pub fetcher: WebFetcherConfig,
    /// Retry policy around each station fetch.
    pub retry: RetryConfig,
    /// Tracked stations, keyed by postal code.
    pub stations: StationCatalog,
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Relative paths in `[storage]` and `[supervisor]` are resolved against
    /// the directory holding the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is a valid socket address
    /// - Storage and supervisor paths are not empty
    /// - The search URL template contains `{postal}` and the price bounds form a range
    /// - The station catalog is not empty, and no station is listed twice
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.supervisor.validate());
        errors.extend(validate_fetcher(&self.fetcher));
        errors.extend(validate_stations(&self.stations));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        resolve(&mut self.storage.path, base);
        resolve(&mut self.supervisor.pid_file, base);
        resolve(&mut self.supervisor.log_file, base);
    }
}

fn resolve(path: &mut PathBuf, base: &Path) {
    if path.is_relative() && !path.as_os_str().is_empty() {
        *path = base.join(&*path);
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        match self.bind.parse::<SocketAddr>() {
            Ok(addr) if addr.port() == 0 => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "port cannot be 0".to_string(),
            }),
            Ok(_) => {}
            Err(_) => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!(
                    "invalid bind address '{}': expected format 'ip:port'",
                    self.bind
                ),
            }),
        }

        errors
    }

    /// URL of the health endpoint as reachable from this host.
    ///
    /// Wildcard bind addresses are replaced by the loopback address.
    pub fn health_url(&self) -> Option<String> {
        let addr: SocketAddr = self.bind.parse().ok()?;
        let ip = match addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        Some(format!(
            "http://{}/api/health",
            SocketAddr::new(ip, addr.port())
        ))
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Price history document path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: fueltrack_store::default_store_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "price history path cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Daemon management configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// File holding the server's process id.
    pub pid_file: PathBuf,
    /// File receiving the server's stdout and stderr.
    pub log_file: PathBuf,
    /// How long `start` waits for the server to become healthy.
    pub startup_grace_secs: u64,
    /// Pause between the stop and start halves of `restart`.
    pub restart_delay_secs: u64,
    /// Pause after sending the termination signal.
    pub stop_wait_secs: u64,
    /// Poll `/api/health` during startup instead of only probing the process.
    pub health_check: bool,
}

/// Maximum startup grace period in seconds.
pub const MAX_STARTUP_GRACE: u64 = 300;

impl Default for SupervisorConfig {
    fn default() -> Self {
        let dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fueltrack");
        Self {
            pid_file: dir.join("fueltrack.pid"),
            log_file: dir.join("server.log"),
            startup_grace_secs: 3,
            restart_delay_secs: 1,
            stop_wait_secs: 1,
            health_check: true,
        }
    }
}

impl SupervisorConfig {
    /// Validate supervisor configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.pid_file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "supervisor.pid_file".to_string(),
                message: "PID file path cannot be empty".to_string(),
            });
        }
        if self.log_file.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "supervisor.log_file".to_string(),
                message: "log file path cannot be empty".to_string(),
            });
        }
        if self.startup_grace_secs > MAX_STARTUP_GRACE {
            errors.push(ValidationError {
                field: "supervisor.startup_grace_secs".to_string(),
                message: format!(
                    "startup grace {} is too long (maximum {} seconds)",
                    self.startup_grace_secs, MAX_STARTUP_GRACE
                ),
            });
        }

        errors
    }
}

fn validate_fetcher(fetcher: &WebFetcherConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !fetcher.search_url.contains(POSTAL_PLACEHOLDER) {
        errors.push(ValidationError {
            field: "fetcher.search_url".to_string(),
            message: format!("URL template must contain {POSTAL_PLACEHOLDER}"),
        });
    }
    if fetcher.timeout_secs == 0 {
        errors.push(ValidationError {
            field: "fetcher.timeout_secs".to_string(),
            message: "timeout cannot be 0".to_string(),
        });
    }
    if !fetcher.bounds.is_valid() {
        errors.push(ValidationError {
            field: "fetcher.bounds".to_string(),
            message: format!(
                "min ({}) must be non-negative and below max ({})",
                fetcher.bounds.min, fetcher.bounds.max
            ),
        });
    }

    errors
}

fn validate_stations(stations: &StationCatalog) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if stations.is_empty() {
        errors.push(ValidationError {
            field: "stations".to_string(),
            message: "no stations configured".to_string(),
        });
        return errors;
    }

    let mut seen = HashSet::new();
    for (postal_code, entries) in stations.iter() {
        if postal_code.trim().is_empty() {
            errors.push(ValidationError {
                field: "stations".to_string(),
                message: "postal code cannot be empty".to_string(),
            });
        }
        if entries.is_empty() {
            errors.push(ValidationError {
                field: format!("stations.{postal_code}"),
                message: "postal code lists no stations".to_string(),
            });
        }
        for (i, station) in entries.iter().enumerate() {
            let prefix = format!("stations.{postal_code}[{i}]");
            if station.name.trim().is_empty() {
                errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: "station name cannot be empty".to_string(),
                });
                continue;
            }
            if station.fuel.trim().is_empty() {
                errors.push(ValidationError {
                    field: format!("{prefix}.fuel"),
                    message: "fuel type cannot be empty".to_string(),
                });
            }
            let key = (station.station_key(), station.fuel.clone());
            if !seen.insert(key) {
                errors.push(ValidationError {
                    field: prefix,
                    message: format!(
                        "duplicate station '{}' for fuel {}",
                        station.station_key(),
                        station.fuel
                    ),
                });
            }
        }
    }

    errors
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `stations.92400[0].name`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fueltrack")
        .join("config.toml")
}
