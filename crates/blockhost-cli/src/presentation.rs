//! Terminal formatting for entries, events and tables.

use blockhost_core::{LifecycleState, LogEntry, ServerEvent};
use chrono::Local;
use std::fmt::Write;

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// `1h 02m 03s` style uptime; `-` for zero.
pub fn format_uptime(secs: u64) -> String {
    if secs == 0 {
        return "-".to_string();
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}

/// One log entry in local time.
pub fn format_entry(entry: &LogEntry) -> String {
    format!(
        "{} [{:<7}] {}",
        entry.timestamp.with_timezone(&Local).format("%H:%M:%S"),
        entry.source.as_str(),
        entry.message
    )
}

/// One broadcast event as a console line.
pub fn format_event(event: &ServerEvent) -> String {
    match event {
        ServerEvent::Log { server_id, entry } => format!("{server_id} | {}", format_entry(entry)),
        ServerEvent::Status(change) => {
            let mut line = format!("{} is {}", change.server_id, change.state.as_str());
            if let Some(pid) = change.pid.filter(|_| change.state == LifecycleState::Running) {
                let _ = write!(line, " (pid {pid})");
            }
            if let Some(code) = change.exit_code {
                let _ = write!(line, " (exit code {code})");
            }
            line
        }
    }
}
