//! Stop command implementation.

use std::process::ExitCode;

use anyhow::Result;

use crate::supervisor::StopOutcome;

use super::Context;

pub async fn cmd_stop(ctx: &Context) -> Result<ExitCode> {
    match ctx.supervisor()?.stop().await? {
        StopOutcome::Stopped { pid } => println!("fueltrack stopped (PID {pid})"),
        StopOutcome::NotRunning => println!("fueltrack is not running"),
    }
    Ok(ExitCode::SUCCESS)
}
