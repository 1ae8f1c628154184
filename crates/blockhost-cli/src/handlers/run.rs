//! Run command handler.
//!
//! Starts servers and stays attached: broadcast events are printed, stdin
//! lines are forwarded as console commands, and Ctrl-C stops everything.

use anyhow::Result;
use blockhost_core::{ConfigStorePort, LifecycleState, ServerEvent};
use blockhost_runtime::TopicEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::format_event;

/// Split a console line into a target server and command.
///
/// `<id> <command>` targets `id` when it is one of `ids`. With a single
/// server any other line goes to it unchanged.
pub fn parse_console_line<'a>(line: &'a str, ids: &'a [String]) -> Option<(&'a str, &'a str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some((head, rest)) = line.split_once(char::is_whitespace) {
        if let Some(id) = ids.iter().find(|id| id.as_str() == head) {
            let rest = rest.trim_start();
            return (!rest.is_empty()).then_some((id.as_str(), rest));
        }
    }
    match ids {
        [only] => Some((only.as_str(), line)),
        _ => None,
    }
}

pub async fn execute(ctx: &CliContext, ids: Vec<String>) -> Result<()> {
    let ids = if ids.is_empty() {
        ctx.store.list_ids().await.map_err(|e| CliError::Store(e.to_string()))?
    } else {
        ids
    };
    if ids.is_empty() {
        return Err(CliError::Config("no servers configured".to_string()).into());
    }

    // Subscribe before starting so no early output is missed.
    let mut events = ctx.broadcaster.subscribe();

    let mut started = Vec::new();
    for id in &ids {
        match ctx.registry.start(id).await {
            Ok(info) => {
                info!(server_id = %id, pid = ?info.pid, "Started");
                started.push(id.clone());
            }
            Err(e) => eprintln!("Failed to start {id}: {e}"),
        }
    }
    if started.is_empty() {
        return Err(CliError::Process("no server could be started".to_string()).into());
    }

    println!(
        "Attached to {}. Type '<id> <command>' to send a console command, Ctrl-C to stop.",
        started.join(", ")
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("Stopping servers...");
                break;
            }
            event = events.recv() => match event {
                Ok(TopicEvent { event, .. }) => {
                    println!("{}", format_event(&event));
                    if is_exit(&event) && ctx.registry.running_ids().await.is_empty() {
                        println!("All servers have exited.");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => forward(ctx, &line, &started).await,
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
        }
    }

    for (id, outcome) in ctx.registry.stop_all().await {
        match outcome {
            Ok(report) if report.forced => println!("{id} was killed"),
            Ok(report) => println!("{id} stopped ({})", report.state.as_str()),
            Err(e) => eprintln!("Failed to stop {id}: {e}"),
        }
    }
    Ok(())
}

fn is_exit(event: &ServerEvent) -> bool {
    matches!(
        event,
        ServerEvent::Status(change)
            if matches!(change.state, LifecycleState::Stopped | LifecycleState::Crashed)
    )
}

async fn forward(ctx: &CliContext, line: &str, ids: &[String]) {
    let Some((id, command)) = parse_console_line(line, ids) else {
        if !line.trim().is_empty() {
            eprintln!("Usage: <id> <command> (servers: {})", ids.join(", "));
        }
        return;
    };
    if let Err(e) = ctx.registry.send_command(id, command).await {
        eprintln!("{e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_targets_named_server() {
        let ids = ids(&["lobby", "survival"]);
        assert_eq!(
            parse_console_line("survival say hi", &ids),
            Some(("survival", "say hi"))
        );
    }

    #[test]
    fn test_single_server_needs_no_prefix() {
        let ids = ids(&["lobby"]);
        assert_eq!(parse_console_line("list", &ids), Some(("lobby", "list")));
        assert_eq!(parse_console_line("lobby list", &ids), Some(("lobby", "list")));
    }

    #[test]
    fn test_ambiguous_lines_are_rejected() {
        let ids = ids(&["lobby", "survival"]);
        assert_eq!(parse_console_line("list", &ids), None);
        assert_eq!(parse_console_line("creative list", &ids), None);
        assert_eq!(parse_console_line("lobby", &ids), None);
        assert_eq!(parse_console_line("   ", &ids), None);
    }
}
