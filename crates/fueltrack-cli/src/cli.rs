//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fueltrack_service::CONFIG_ENV;

/// Track daily fuel prices and serve a dashboard.
#[derive(Debug, Parser)]
#[command(name = "fueltrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (default: ~/.config/fueltrack/config.toml)
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the dashboard server in the background
    Start,

    /// Stop the background server
    Stop,

    /// Show whether the server is running (default)
    Status,

    /// Stop, then start the server
    Restart,

    /// Fetch today's price for every configured station
    Fetch(FetchArgs),

    /// Run the dashboard server in the foreground
    #[command(hide = true)]
    Serve,
}

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Only fetch stations under this postal code
    #[arg(short, long)]
    pub postal: Option<String>,

    /// Fetch and print prices without storing them
    #[arg(long)]
    pub dry_run: bool,
}
