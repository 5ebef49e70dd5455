//! Lifecycle management for the singleton dashboard server.
//!
//! The server runs as a detached process whose id is recorded in a PID
//! file. Every operation re-reads that file, so state survives across
//! invocations of the command-line tool:
//!
//! ```text
//! Stopped ──start──▶ Starting ──healthy──▶ Running ──stop──▶ Stopping ──▶ Stopped
//!                        │
//!                        └──process died──▶ Crashed
//! ```
//!
//! A crash while running is only noticed lazily, when a later operation
//! finds a PID file whose process is gone.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use fueltrack_service::SupervisorConfig;
use fueltrack_store::{JsonStore, PriceStore};

use crate::process::ProcessControl;

/// Interval between health polls during startup.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Lines of the server log included in startup errors.
const LOG_TAIL_LINES: usize = 20;

/// Server lifecycle states, as logged on each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Crashed,
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProcessState::Stopped => "stopped",
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::Stopping => "stopping",
            ProcessState::Crashed => "crashed",
        };
        f.write_str(name)
    }
}

fn transition(pid: u32, from: ProcessState, to: ProcessState) {
    info!(pid, %from, %to, "Server {} -> {}", from, to);
}

/// Result of [`Supervisor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: u32 },
    AlreadyRunning { pid: u32 },
}

/// Result of [`Supervisor::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { pid: u32 },
    NotRunning,
}

/// Result of [`Supervisor::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReport {
    Running { pid: u32, records: usize },
    /// Not running; `stale_pid` is set when a leftover PID file was removed.
    Stopped { stale_pid: Option<u32> },
}

/// Supervisor failures.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to spawn server: {0}")]
    Spawn(io::Error),

    #[error("Failed to signal process {pid}: {source}")]
    Signal { pid: u32, source: io::Error },

    #[error("PID file {path}: {source}")]
    PidFile { path: PathBuf, source: io::Error },

    #[error("Failed to prepare log file {path}: {source}")]
    LogFile { path: PathBuf, source: io::Error },

    #[error("Server (PID {pid}) exited during startup. Last log lines:\n{log_tail}")]
    Crashed { pid: u32, log_tail: String },

    #[error("Server (PID {pid}) is running but never became healthy. Last log lines:\n{log_tail}")]
    Unhealthy { pid: u32, log_tail: String },

    #[error(transparent)]
    Store(#[from] fueltrack_store::Error),
}

/// Something that can tell whether the server process `pid` answers requests.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn is_healthy(&self, pid: u32) -> bool;
}

/// The part of the `/api/health` body the supervisor checks.
#[derive(Debug, Deserialize)]
struct HealthBody {
    pid: u32,
}

impl HealthBody {
    /// Whether the answer came from `pid` rather than another instance
    /// still bound to the same address.
    fn answered_by(&self, pid: u32) -> bool {
        if self.pid != pid {
            warn!("Health endpoint answered by PID {} instead of {}", self.pid, pid);
            return false;
        }
        true
    }
}

/// Polls the server's `/api/health` endpoint.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpHealthProbe {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn is_healthy(&self, pid: u32) -> bool {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("Health check {} returned {}", self.url, response.status());
                return false;
            }
            Err(e) => {
                debug!("Health check {} failed: {}", self.url, e);
                return false;
            }
        };

        match response.json::<HealthBody>().await {
            Ok(body) => body.answered_by(pid),
            Err(e) => {
                debug!("Unreadable health response from {}: {}", self.url, e);
                false
            }
        }
    }
}

/// Starts, stops and inspects the server process through its PID file.
pub struct Supervisor<P> {
    config: SupervisorConfig,
    store_path: PathBuf,
    processes: P,
    health: Option<Box<dyn HealthProbe>>,
}

impl<P: ProcessControl> Supervisor<P> {
    /// Create a supervisor; without a health probe, startup only checks
    /// that the process is still alive after the grace period.
    pub fn new(
        config: SupervisorConfig,
        store_path: impl Into<PathBuf>,
        processes: P,
        health: Option<Box<dyn HealthProbe>>,
    ) -> Self {
        Self {
            config,
            store_path: store_path.into(),
            processes,
            health,
        }
    }

    pub fn pid_file(&self) -> &Path {
        &self.config.pid_file
    }

    /// Start the server unless it is already running.
    pub async fn start(&self) -> Result<StartOutcome, SupervisorError> {
        if let Some(pid) = self.read_pid()? {
            if self.processes.is_alive(pid) {
                info!("Server already running (PID {})", pid);
                return Ok(StartOutcome::AlreadyRunning { pid });
            }
            warn!("Server (PID {}) is no longer running, removing stale PID file", pid);
            transition(pid, ProcessState::Running, ProcessState::Crashed);
            self.remove_pid()?;
        }

        self.prepare_log_file()?;
        let pid = self
            .processes
            .spawn_server(&self.config.log_file)
            .map_err(SupervisorError::Spawn)?;
        transition(pid, ProcessState::Stopped, ProcessState::Starting);
        self.write_pid(pid)?;

        self.await_startup(pid).await
    }

    async fn await_startup(&self, pid: u32) -> Result<StartOutcome, SupervisorError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.startup_grace_secs);

        loop {
            if !self.processes.is_alive(pid) {
                return Err(self.crashed(pid)?);
            }

            if let Some(health) = &self.health
                && health.is_healthy(pid).await
            {
                // The child may have died while the request was in flight.
                if !self.processes.is_alive(pid) {
                    return Err(self.crashed(pid)?);
                }
                transition(pid, ProcessState::Starting, ProcessState::Running);
                return Ok(StartOutcome::Started { pid });
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }

        if !self.processes.is_alive(pid) {
            return Err(self.crashed(pid)?);
        }

        if self.health.is_some() {
            warn!("Server (PID {}) did not become healthy in time", pid);
            return Err(SupervisorError::Unhealthy {
                pid,
                log_tail: self.log_tail(),
            });
        }

        transition(pid, ProcessState::Starting, ProcessState::Running);
        Ok(StartOutcome::Started { pid })
    }

    /// Record a startup crash and build the error carrying the log tail.
    fn crashed(&self, pid: u32) -> Result<SupervisorError, SupervisorError> {
        transition(pid, ProcessState::Starting, ProcessState::Crashed);
        self.remove_pid()?;
        Ok(SupervisorError::Crashed {
            pid,
            log_tail: self.log_tail(),
        })
    }

    /// Stop the server if it is running. The PID file is removed either way.
    pub async fn stop(&self) -> Result<StopOutcome, SupervisorError> {
        let Some(pid) = self.read_pid()? else {
            info!("Server is not running");
            return Ok(StopOutcome::NotRunning);
        };

        if !self.processes.is_alive(pid) {
            info!("Server (PID {}) is not running, removing stale PID file", pid);
            self.remove_pid()?;
            return Ok(StopOutcome::NotRunning);
        }

        transition(pid, ProcessState::Running, ProcessState::Stopping);
        self.processes
            .terminate(pid)
            .map_err(|e| SupervisorError::Signal { pid, source: e })?;
        sleep(Duration::from_secs(self.config.stop_wait_secs)).await;

        if self.processes.is_alive(pid) {
            warn!("Server (PID {}) is still running after SIGTERM", pid);
        }
        self.remove_pid()?;
        transition(pid, ProcessState::Stopping, ProcessState::Stopped);
        Ok(StopOutcome::Stopped { pid })
    }

    /// Report whether the server is running, cleaning up a stale PID file.
    pub fn status(&self) -> Result<StatusReport, SupervisorError> {
        match self.read_pid()? {
            Some(pid) if self.processes.is_alive(pid) => {
                let records = JsonStore::open(&self.store_path)?.load_all().len();
                Ok(StatusReport::Running { pid, records })
            }
            Some(pid) => {
                warn!("Server (PID {}) is no longer running, removing stale PID file", pid);
                transition(pid, ProcessState::Running, ProcessState::Crashed);
                self.remove_pid()?;
                Ok(StatusReport::Stopped {
                    stale_pid: Some(pid),
                })
            }
            None => Ok(StatusReport::Stopped { stale_pid: None }),
        }
    }

    /// Stop, wait the restart delay, then start.
    pub async fn restart(&self) -> Result<StartOutcome, SupervisorError> {
        self.stop().await?;
        sleep(Duration::from_secs(self.config.restart_delay_secs)).await;
        self.start().await
    }

    /// The recorded process id. An unreadable PID file is removed and
    /// reported as absent.
    fn read_pid(&self) -> Result<Option<u32>, SupervisorError> {
        let path = &self.config.pid_file;
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SupervisorError::PidFile {
                    path: path.clone(),
                    source: e,
                });
            }
        };

        match content.trim().parse::<u32>() {
            Ok(pid) if pid > 0 => Ok(Some(pid)),
            _ => {
                warn!(
                    "Ignoring unreadable PID file {}: {:?}",
                    path.display(),
                    content.trim()
                );
                self.remove_pid()?;
                Ok(None)
            }
        }
    }

    fn write_pid(&self, pid: u32) -> Result<(), SupervisorError> {
        let path = &self.config.pid_file;
        let pid_error = |e| SupervisorError::PidFile {
            path: path.clone(),
            source: e,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(pid_error)?;
        }
        std::fs::write(path, format!("{pid}\n")).map_err(pid_error)
    }

    fn remove_pid(&self) -> Result<(), SupervisorError> {
        match std::fs::remove_file(&self.config.pid_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SupervisorError::PidFile {
                path: self.config.pid_file.clone(),
                source: e,
            }),
        }
    }

    fn prepare_log_file(&self) -> Result<(), SupervisorError> {
        if let Some(parent) = self.config.log_file.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| SupervisorError::LogFile {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }

    fn log_tail(&self) -> String {
        match std::fs::read_to_string(&self.config.log_file) {
            Ok(content) => tail_lines(&content, LOG_TAIL_LINES),
            Err(e) => format!("(log file {} unavailable: {})", self.config.log_file.display(), e),
        }
    }
}

fn tail_lines(content: &str, count: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
