//! # EventLog: persistent execution history.
//!
//! Writes one line per event and flushes after each line, so the file is complete up
//! to the last event even if the process dies:
//!
//! ```text
//! [14:03:07.112] [SYSTEM         ] : Logger Initialized. Recording events...
//! [14:03:07.169] [Producer-1     ] : ADDED Record-1-1 | Queue Size: 1
//! [14:03:07.201] [Consumer-1     ] : PROCESSED Record-1-1 | Queue Size: 0
//! [14:03:09.884] [SYSTEM         ] : System Shutdown. Closing logs.
//! ```
//!
//! The file is truncated on [`create`](EventLog::create) and closed in
//! [`on_shutdown`](crate::Subscribe::on_shutdown). Write errors after opening are
//! reported once through `tracing` and the sink goes quiet.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
    sync::Mutex,
};

use crate::events::Event;
use crate::subscribers::Subscribe;

/// File sink subscriber.
pub struct EventLog {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl EventLog {
    /// Creates (or truncates) `path` and writes the opening line.
    pub async fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = BufWriter::new(File::create(&path).await?);
        let opening = format_line(
            SystemTime::now(),
            "SYSTEM",
            "Logger Initialized. Recording events...",
        );
        writer.write_all(opening.as_bytes()).await?;
        writer.flush().await?;
        Ok(Self {
            path,
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_line(&self, line: String) {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return;
        };
        let res = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await;
        if let Err(err) = res {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "event log write failed; disabling"
            );
            *guard = None;
        }
    }
}

#[async_trait]
impl Subscribe for EventLog {
    async fn on_event(&self, ev: &Event) {
        let line = format_line(ev.at, ev.component_or_system(), ev.message_or_label());
        self.write_line(line).await;
    }

    async fn on_shutdown(&self) {
        self.write_line(format_line(
            SystemTime::now(),
            "SYSTEM",
            "System Shutdown. Closing logs.",
        ))
        .await;
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    fn name(&self) -> &'static str {
        "EventLog"
    }

    fn queue_capacity(&self) -> usize {
        16 * 1024
    }
}

/// `[HH:MM:SS.mmm] [component:<15] : message\n`
fn format_line(at: SystemTime, component: &str, message: &str) -> String {
    let ts = DateTime::<Local>::from(at).format("%H:%M:%S%.3f");
    format!("[{ts}] [{component:<15}] : {message}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_layout() {
        let line = format_line(
            SystemTime::now(),
            "Producer-1",
            "ADDED Record-1-1 | Queue Size: 1",
        );
        assert_eq!(line.as_bytes()[0], b'[');
        assert_eq!(&line[13..], "] [Producer-1     ] : ADDED Record-1-1 | Queue Size: 1\n");
    }

    #[tokio::test]
    async fn test_writes_and_closes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.log");
        let log = EventLog::create(&path).await.unwrap();

        log.on_event(&Event::log("Consumer-1", "PROCESSED Record-1-1 | Queue Size: 0"))
            .await;
        log.on_shutdown().await;
        // No-op once closed.
        log.on_event(&Event::log("SYSTEM", "late")).await;

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[SYSTEM         ] : Logger Initialized. Recording events..."));
        assert!(lines[1].ends_with("[Consumer-1     ] : PROCESSED Record-1-1 | Queue Size: 0"));
        assert!(lines[2].ends_with("System Shutdown. Closing logs."));
    }

    #[tokio::test]
    async fn test_create_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("history.log");
        assert!(EventLog::create(&path).await.is_err());
    }
}
