//! Status command implementation.

use std::process::ExitCode;

use anyhow::Result;

use crate::supervisor::StatusReport;

use super::Context;

/// Print the server state. Exits with failure when the server is stopped.
pub fn cmd_status(ctx: &Context) -> Result<ExitCode> {
    match ctx.supervisor()?.status()? {
        StatusReport::Running { pid, records } => {
            println!("fueltrack is running (PID {pid})");
            println!("  dashboard: http://{}", ctx.config.server.bind);
            println!("  records:   {records}");
            Ok(ExitCode::SUCCESS)
        }
        StatusReport::Stopped { stale_pid } => {
            match stale_pid {
                Some(pid) => println!("fueltrack is stopped (PID {pid} had exited)"),
                None => println!("fueltrack is stopped"),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
