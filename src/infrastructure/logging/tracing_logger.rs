//! Adapters for the kernel's [`Logger`] port.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::domain::ports::{Level, Logger};

/// Forwards kernel messages to `tracing`, with the structured context
/// attached as a `context` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str, context: Value) {
        match level {
            Level::Trace => tracing::trace!(target: "tickwise::kernel", %context, "{message}"),
            Level::Debug => tracing::debug!(target: "tickwise::kernel", %context, "{message}"),
            Level::Info => tracing::info!(target: "tickwise::kernel", %context, "{message}"),
            Level::Warn => tracing::warn!(target: "tickwise::kernel", %context, "{message}"),
            Level::Error => tracing::error!(target: "tickwise::kernel", %context, "{message}"),
        }
    }
}

/// One captured log call.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
    pub context: Value,
}

/// Logger that keeps every entry in memory. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries at `level` whose message contains `needle`.
    pub fn find(&self, level: Level, needle: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level && entry.message.contains(needle))
            .collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str, context: Value) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                level,
                message: message.to_string(),
                context,
            });
    }
}
