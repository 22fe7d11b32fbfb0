//! Error and warning sink
//!
//! Every caught failure in the audio and playback layers is reported here.
//! Sinks are fire-and-forget: they must never panic or hand an error back.

use crate::error::ErrorKind;
use serde_json::Value;
use std::error::Error;
use std::sync::Mutex;

/// Receives errors and warnings observed during playback
pub trait ErrorSink: Send + Sync {
    /// Records a failure. `source` names the component that caught it.
    fn log_error(&self, error: &dyn Error, source: &str, metadata: Option<&Value>);

    /// Records a diagnostic warning
    fn log_warning(&self, message: &str, source: &str, metadata: Option<&Value>);
}

/// Forwards everything to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn log_error(&self, error: &dyn Error, source: &str, metadata: Option<&Value>) {
        match metadata {
            Some(meta) => log::error!("[{}] {} {}", source, error, meta),
            None => log::error!("[{}] {}", source, error),
        }
    }

    fn log_warning(&self, message: &str, source: &str, metadata: Option<&Value>) {
        match metadata {
            Some(meta) => log::warn!("[{}] {} {}", source, message, meta),
            None => log::warn!("[{}] {}", source, message),
        }
    }
}

/// Level of a recorded entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkLevel {
    Error,
    Warning,
}

/// One entry captured by [`RecordingErrorSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct SinkEntry {
    pub level: SinkLevel,
    pub message: String,
    pub source: String,
    pub metadata: Option<Value>,
}

impl SinkEntry {
    /// The `"kind"` field of the metadata, if present
    pub fn kind(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.get("kind"))
            .and_then(Value::as_str)
    }
}

/// Keeps every entry in memory and also forwards to the `log` facade
#[derive(Debug, Default)]
pub struct RecordingErrorSink {
    entries: Mutex<Vec<SinkEntry>>,
}

impl RecordingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: SinkEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(entry);
    }

    /// Snapshot of all recorded entries
    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Entries tagged with the given error kind
    pub fn entries_of_kind(&self, kind: ErrorKind) -> Vec<SinkEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.kind() == Some(kind.as_str()))
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.level == SinkLevel::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.level == SinkLevel::Warning)
            .count()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl ErrorSink for RecordingErrorSink {
    fn log_error(&self, error: &dyn Error, source: &str, metadata: Option<&Value>) {
        LogErrorSink.log_error(error, source, metadata);
        self.push(SinkEntry {
            level: SinkLevel::Error,
            message: error.to_string(),
            source: source.to_string(),
            metadata: metadata.cloned(),
        });
    }

    fn log_warning(&self, message: &str, source: &str, metadata: Option<&Value>) {
        LogErrorSink.log_warning(message, source, metadata);
        self.push(SinkEntry {
            level: SinkLevel::Warning,
            message: message.to_string(),
            source: source.to_string(),
            metadata: metadata.cloned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoryError;
    use serde_json::json;

    #[test]
    fn test_recording_sink_captures_entries() {
        let sink = RecordingErrorSink::new();
        sink.log_error(
            &StoryError::NoPages,
            "factory",
            Some(&json!({"kind": "SetupFailure"})),
        );
        sink.log_warning("ignored", "orchestrator", None);

        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 1);
        assert_eq!(sink.entries_of_kind(ErrorKind::SetupFailure).len(), 1);
        assert_eq!(sink.entries()[0].message, "Story has no pages");
    }

    #[test]
    fn test_clear() {
        let sink = RecordingErrorSink::new();
        sink.log_warning("a", "b", None);
        sink.clear();
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_log_sink_does_not_panic() {
        LogErrorSink.log_error(&StoryError::EmptyTitle, "test", None);
        LogErrorSink.log_warning("warn", "test", Some(&json!({"x": 1})));
    }
}
