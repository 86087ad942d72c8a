//! Bounded audit log of structural changes, persisted with each save.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document;

/// Maximum number of entries retained in the log.
pub const MAX_LOG_ENTRIES: usize = 1000;

/// One recorded collection/index mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Short operation name, e.g. `createCollection`, `insert`.
    pub operation: String,
    /// Operation-specific details.
    pub details:   Value,
    /// When the operation was recorded, RFC 3339.
    pub timestamp: String,
}

/// The bounded operation log.
///
/// Only the most recent [`MAX_LOG_ENTRIES`] entries survive; older entries
/// are dropped on record and before each save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationLog {
    entries: Vec<LogEntry>,
}

impl OperationLog {
    /// An empty log.
    pub fn new() -> Self { Self::default() }

    /// Records an operation, trimming to the bound.
    pub fn record(&mut self, operation: &str, details: Value) {
        self.entries.push(LogEntry {
            operation: operation.to_owned(),
            details,
            timestamp: document::now_string(),
        });
        self.trim();
    }

    /// Drops all but the most recent [`MAX_LOG_ENTRIES`] entries.
    pub fn trim(&mut self) {
        if self.entries.len() > MAX_LOG_ENTRIES {
            let excess = self.entries.len() - MAX_LOG_ENTRIES;
            self.entries.drain(..excess);
        }
    }

    /// Removes every entry.
    pub fn clear(&mut self) { self.entries.clear(); }

    /// Number of retained entries.
    pub fn len(&self) -> usize { self.entries.len() }

    /// Returns true if the log holds no entries.
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Iterates over retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> { self.entries.iter() }
}
