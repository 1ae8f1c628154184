//! Status command handler.

use anyhow::Result;
use chrono::{Local, Utc};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::format_uptime;

pub async fn execute(ctx: &CliContext, id: &str) -> Result<()> {
    let status = ctx.registry.status(id).await.map_err(CliError::from)?;

    println!("Server:  {}", status.server_id);
    println!("State:   {}", status.state.as_str());
    if let Some(process) = &status.process {
        if let Some(pid) = process.pid {
            println!("PID:     {pid}");
        }
        let uptime = u64::try_from((Utc::now() - process.started_at).num_seconds()).unwrap_or(0);
        println!(
            "Started: {} ({})",
            process.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            format_uptime(uptime)
        );
    }
    if let Some(usage) = &status.usage {
        println!(
            "Usage:   {:.1}% CPU, {} MiB",
            usage.cpu_percent,
            usage.memory_bytes / (1024 * 1024)
        );
    }
    if let Some(exit) = &status.last_exit {
        let code = exit
            .code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        println!(
            "Last exit: {} at {} (code {code}{})",
            exit.state.as_str(),
            exit.exited_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            if exit.forced { ", killed" } else { "" }
        );
    }
    Ok(())
}
