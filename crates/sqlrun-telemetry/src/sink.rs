use std::collections::VecDeque;

use parking_lot::Mutex;
use sqlrun_otel::TELEMETRY_TARGET;

use crate::entry::LogEntry;
use crate::level::LogLevel;

/// Destination for finished log entries.
///
/// Sinks see every entry at or above the logger's minimum level and decide
/// themselves what to keep. A sink that ships ERROR entries to a remote
/// collector plugs in here.
pub trait LogSink: Send + Sync {
    fn emit(&self, entry: &LogEntry);
}

/// Forwards entries to the `tracing` subscriber on [`TELEMETRY_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

macro_rules! telemetry_event {
    ($macro:ident, $entry:expr, $context:expr) => {
        tracing::$macro!(
            target: TELEMETRY_TARGET,
            session_id = %$entry.session_id,
            correlation_id = %$entry.correlation_id,
            environment = %$entry.environment,
            context = %$context,
            "{}",
            $entry.message
        )
    };
}

impl LogSink for TracingSink {
    fn emit(&self, entry: &LogEntry) {
        let context = serde_json::to_string(&entry.context).unwrap_or_default();
        match entry.level {
            LogLevel::Debug => telemetry_event!(debug, entry, context),
            LogLevel::Info => telemetry_event!(info, entry, context),
            LogLevel::Warn => telemetry_event!(warn, entry, context),
            LogLevel::Error => telemetry_event!(error, entry, context),
        }
    }
}

/// Keeps the most recent entries in memory, oldest dropped first.
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        MemorySink {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Entries whose `type` context field equals `kind`.
    pub fn entries_of_kind(&self, kind: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.kind() == Some(kind))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, entry: &LogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
    }
}
