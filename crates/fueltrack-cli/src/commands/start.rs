//! Start command implementation.

use std::process::ExitCode;

use anyhow::Result;

use crate::supervisor::StartOutcome;

use super::Context;

pub async fn cmd_start(ctx: &Context) -> Result<ExitCode> {
    let supervisor = ctx.supervisor()?;
    match supervisor.start().await? {
        StartOutcome::Started { pid } => {
            println!("fueltrack started (PID {pid})");
            println!("Dashboard on http://{}", ctx.config.server.bind);
        }
        StartOutcome::AlreadyRunning { pid } => {
            println!("fueltrack is already running (PID {pid})");
        }
    }
    Ok(ExitCode::SUCCESS)
}
