//! Restart command implementation.

use std::process::ExitCode;

use anyhow::Result;

use crate::supervisor::StartOutcome;

use super::Context;

pub async fn cmd_restart(ctx: &Context) -> Result<ExitCode> {
    let pid = match ctx.supervisor()?.restart().await? {
        StartOutcome::Started { pid } | StartOutcome::AlreadyRunning { pid } => pid,
    };
    println!("fueltrack restarted (PID {pid})");
    Ok(ExitCode::SUCCESS)
}
