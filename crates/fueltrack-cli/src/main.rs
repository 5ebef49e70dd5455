use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fueltrack_cli::cli::{Cli, Commands};
use fueltrack_cli::commands::{
    Context, cmd_fetch, cmd_restart, cmd_serve, cmd_start, cmd_status, cmd_stop,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // Logs go to stderr; stdout carries command output only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let ctx = Context::load(cli.config.as_deref())?;
    match cli.command.unwrap_or(Commands::Status) {
        Commands::Start => cmd_start(&ctx).await,
        Commands::Stop => cmd_stop(&ctx).await,
        Commands::Status => cmd_status(&ctx),
        Commands::Restart => cmd_restart(&ctx).await,
        Commands::Fetch(args) => cmd_fetch(&ctx, &args).await,
        Commands::Serve => cmd_serve(&ctx).await,
    }
}
