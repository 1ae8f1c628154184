//! Logs command handler.

use anyhow::Result;
use blockhost_core::{LogFilter, LogSource};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::format_entry;

pub async fn execute(
    ctx: &CliContext,
    id: &str,
    source: Option<LogSource>,
    search: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let filter = LogFilter {
        source,
        search,
        limit,
    };
    let entries = ctx
        .registry
        .get_logs(id, &filter)
        .await
        .map_err(CliError::from)?;

    if entries.is_empty() {
        println!("No log entries for {id}.");
    }
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}
