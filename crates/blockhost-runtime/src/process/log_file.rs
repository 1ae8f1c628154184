//! Offline reader for a server's persisted log file.
//!
//! Used when no process is running. Lines look like
//! `[12:34:56] [Server thread/INFO]: Done (3.2s)!`. The file carries no date,
//! so parsed times are placed on the current local calendar day. Lines that
//! do not match are kept whole and stamped with the time they were read;
//! their timestamps are therefore only approximate.

use blockhost_core::{LogEntry, LogFilter, LogSource};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{2}):(\d{2}):(\d{2})\] \[([^\]]*)\]: (.*)$").expect("log line pattern is valid")
});

/// Reads and parses a persisted log file.
#[derive(Debug, Clone)]
pub struct LogFileReader {
    path: PathBuf,
}

impl LogFileReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file and apply `filter`.
    ///
    /// A missing file yields no entries. Invalid UTF-8 is decoded lossily.
    pub async fn read(&self, filter: &LogFilter) -> io::Result<Vec<LogEntry>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted log file");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let content = String::from_utf8_lossy(&bytes);
        let today = Local::now().date_naive();
        let now = Utc::now();
        let entries = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| parse_line(line, today, now));

        Ok(filter.apply(entries))
    }
}

/// Parse one log line.
///
/// `today` is the calendar day matched times are placed on; `now` stamps
/// lines that do not match the pattern.
pub fn parse_line(line: &str, today: NaiveDate, now: DateTime<Utc>) -> LogEntry {
    let line = line.trim_end_matches('\r');
    let Some(caps) = LINE_PATTERN.captures(line) else {
        return LogEntry::at(now, LogSource::Stdout, line);
    };

    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let timestamp = match (field(1), field(2), field(3)) {
        (Some(h), Some(m), Some(s)) => NaiveTime::from_hms_opt(h, m, s)
            .and_then(|time| today.and_time(time).and_local_timezone(Local).earliest())
            .map_or(now, |local| local.with_timezone(&Utc)),
        _ => now,
    };

    let level = caps.get(4).map_or("", |m| m.as_str());
    let source = if level.contains("ERROR") {
        LogSource::Stderr
    } else {
        LogSource::Stdout
    };

    LogEntry::at(timestamp, source, line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    #[test]
    fn error_level_maps_to_stderr_with_full_line() {
        let line = "[12:34:56] [Server thread/ERROR]: Oops";
        let entry = parse_line(line, today(), Utc::now());

        assert_eq!(entry.source, LogSource::Stderr);
        assert_eq!(entry.message, line);

        let local = entry.timestamp.with_timezone(&Local);
        assert_eq!(
            (local.hour(), local.minute(), local.second()),
            (12, 34, 56)
        );
        assert_eq!(local.date_naive(), today());
    }

    #[test]
    fn info_level_maps_to_stdout() {
        let entry = parse_line(
            "[08:00:01] [Server thread/INFO]: Done (3.2s)!",
            today(),
            Utc::now(),
        );
        assert_eq!(entry.source, LogSource::Stdout);
    }

    #[test]
    fn unmatched_line_uses_read_time() {
        let now = Utc::now();
        let entry = parse_line("java.lang.NullPointerException", today(), now);
        assert_eq!(entry.source, LogSource::Stdout);
        assert_eq!(entry.timestamp, now);
        assert_eq!(entry.message, "java.lang.NullPointerException");
    }

    #[test]
    fn out_of_range_time_falls_back_to_now() {
        let now = Utc::now();
        let entry = parse_line("[25:61:61] [Server thread/WARN]: odd", today(), now);
        assert_eq!(entry.timestamp, now);
    }

    #[tokio::test]
    async fn read_applies_filter_and_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.log");
        tokio::fs::write(
            &path,
            "[10:00:00] [Server thread/INFO]: Starting\n\n[10:00:01] [Server thread/ERROR]: Broken\n\tat Foo.bar\n[10:00:02] [Server thread/INFO]: Done\n",
        )
        .await
        .unwrap();

        let reader = LogFileReader::new(&path);
        let all = reader.read(&LogFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);

        let errors = reader
            .read(&LogFilter::default().with_source(LogSource::Stderr))
            .await
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.ends_with("Broken"));

        let last = reader
            .read(&LogFilter::default().with_search("done").with_limit(1))
            .await
            .unwrap();
        assert_eq!(last.len(), 1);
        assert!(last[0].message.ends_with("Done"));
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reader = LogFileReader::new(dir.path().join("logs/latest.log"));
        assert!(reader.read(&LogFilter::default()).await.unwrap().is_empty());
    }
}
