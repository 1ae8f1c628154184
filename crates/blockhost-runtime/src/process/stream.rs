//! Async stream log readers (non-UTF8-safe).
//!
//! Game servers and their plugins can emit non-UTF8 bytes on stdout/stderr.
//! `BufReader::lines()` terminates on invalid UTF-8, so lines are read as
//! bytes and decoded lossily to keep capture running.

use blockhost_core::LogSource;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

use super::sink::LogSink;

/// Spawn a task that forwards every line of `stream` to `sink`.
///
/// The task ends at EOF or on the first read error.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    source: LogSource,
    sink: Arc<LogSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    // Trim trailing newline(s)
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }

                    let line = String::from_utf8_lossy(&buf).into_owned();
                    debug!(server_id = %sink.server_id(), %source, "{}", line);
                    sink.append(source, line);
                }
                Err(e) => {
                    debug!(server_id = %sink.server_id(), %source, error = %e, "log stream reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(server_id = %sink.server_id(), %source, "log stream reader task exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockhost_core::NoopBroadcast;

    #[tokio::test]
    async fn reads_lines_including_invalid_utf8() {
        let sink = Arc::new(LogSink::new("alpha", 10, Arc::new(NoopBroadcast)));
        let input: &[u8] = b"first\r\nsec\xffond\nno newline";

        spawn_stream_reader(input, LogSource::Stderr, sink.clone())
            .await
            .unwrap();

        let entries = sink.snapshot();
        let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "sec\u{fffd}ond", "no newline"]);
        assert!(entries.iter().all(|e| e.source == LogSource::Stderr));
    }
}
