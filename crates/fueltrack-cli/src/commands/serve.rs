//! Serve command implementation: the foreground server `start` spawns.

use std::process::ExitCode;

use anyhow::Result;

use super::Context;

pub async fn cmd_serve(ctx: &Context) -> Result<ExitCode> {
    fueltrack_service::serve(ctx.config.clone()).await?;
    Ok(ExitCode::SUCCESS)
}
