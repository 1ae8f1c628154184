//! List command handler.

use anyhow::Result;
use futures_util::TryStreamExt;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{format_uptime, print_separator};

/// Print every configured server with its state and uptime.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let summaries: Vec<_> = ctx
        .registry
        .list_all()
        .map_err(CliError::from)
        .try_collect()
        .await?;

    if summaries.is_empty() {
        println!("No servers configured.");
        return Ok(());
    }

    println!("{:<24} {:<10} Uptime", "ID", "State");
    print_separator(48);
    for summary in summaries {
        println!(
            "{:<24} {:<10} {}",
            summary.server_id,
            summary.state.as_str(),
            format_uptime(summary.uptime_secs)
        );
    }
    Ok(())
}
