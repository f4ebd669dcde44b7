//! Append-only chat event log.
//!
//! The relay's only durable artifact: one timestamped line per join,
//! leave, and relayed message, written synchronously as broadcasts
//! happen. The sink is a trait so the daemon writes a file while tests
//! record in memory; it carries its own lock, independent of the
//! registry's serialization, so log latency never couples with
//! registration latency.
//!
//! The log is line-oriented and human-readable. Rotation is out of
//! scope; external tools may tail it for history.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use tracing::warn;

/// Destination for chat log records.
///
/// Relayed messages and life-cycle notices are distinct record kinds so
/// message content stays separable from membership churn.
pub trait EventSink: Send + Sync {
    /// Appends a relayed-message record.
    fn message(&self, line: &str);

    /// Appends a life-cycle (join/leave) record.
    fn event(&self, line: &str);
}

// ============================================================================
// File sink
// ============================================================================

/// Appends timestamped records to a log file.
pub struct FileSink {
    /// The open log file; the mutex serializes appends.
    file: Mutex<File>,
}

impl FileSink {
    /// Opens (or creates) the log file in append mode.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one timestamped line. Failures are logged, never
    /// propagated: the chat log is best-effort.
    fn append(&self, line: &str) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");

        match self.file.lock() {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{stamp} - {line}") {
                    warn!(error = %e, "Failed to append to chat log");
                }
            }
            Err(_) => warn!("Chat log lock poisoned, dropping record"),
        }
    }
}

impl EventSink for FileSink {
    fn message(&self, line: &str) {
        self.append(line);
    }

    fn event(&self, line: &str) {
        self.append(line);
    }
}

// ============================================================================
// In-memory sink
// ============================================================================

/// Record kind as seen by an in-memory sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A relayed chat message.
    Message,
    /// A join/leave life-cycle notice.
    Event,
}

/// One recorded log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Which sink method recorded it.
    pub kind: RecordKind,
    /// The logged line, without timestamp.
    pub line: String,
}

/// Records log entries in memory instead of a file.
///
/// The swappable sink used by the test suite; also handy for running
/// the relay without a durable log.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    /// Creates an empty in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    fn record(&self, kind: RecordKind, line: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord {
                kind,
                line: line.to_string(),
            });
        }
    }
}

impl EventSink for MemorySink {
    fn message(&self, line: &str) {
        self.record(RecordKind::Message, line);
    }

    fn event(&self, line: &str) {
        self.record(RecordKind::Event, line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_distinguishes_record_kinds() {
        let sink = MemorySink::new();

        sink.message("[alice] hello");
        sink.event("** alice is leaving the chat **");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records.first(),
            Some(&LogRecord {
                kind: RecordKind::Message,
                line: "[alice] hello".to_string(),
            })
        );
        assert_eq!(
            records.get(1).map(|r| r.kind),
            Some(RecordKind::Event)
        );
    }

    #[test]
    fn test_file_sink_appends_timestamped_lines() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("chat.log");

        let sink = FileSink::open(&path).expect("open sink");
        sink.event("** alice is joining the chat **");
        sink.message("[alice] hello");

        let contents = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            // "YYYY-MM-DD HH:MM:SS.mmm - <record>"
            assert!(line.contains(" - "), "missing timestamp separator: {line}");
        }
        assert!(lines
            .first()
            .is_some_and(|l| l.ends_with("** alice is joining the chat **")));
        assert!(lines.get(1).is_some_and(|l| l.ends_with("[alice] hello")));
    }

    #[test]
    fn test_file_sink_appends_across_reopens() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("chat.log");

        FileSink::open(&path)
            .expect("open sink")
            .message("[alice] first");
        FileSink::open(&path)
            .expect("reopen sink")
            .message("[alice] second");

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(contents.lines().count(), 2);
    }
}
