//! Log store trait and the in-memory backend
//!
//! The in-memory store backs runs without a configured log database and is
//! handy for driving the correlator from tests.

use crate::logs::{LogEntry, LogStoreError, LogStoreResult, Severity};
use std::sync::Mutex;

/// Trait for log store backends
///
/// Implementations must return entries ordered newest first (descending
/// insertion id).
pub trait LogStore: Send + Sync {
    /// Returns entries recorded for `location` at or after `since` whose
    /// severity is at least `min_severity`
    fn query(
        &self,
        location: &str,
        since: i64,
        min_severity: Severity,
    ) -> LogStoreResult<Vec<LogEntry>>;
}

/// Log store held in memory
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, assigning it the next insertion id
    ///
    /// Returns the assigned id.
    pub fn record(&self, mut entry: LogEntry) -> i64 {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = entries.last().map_or(1, |last| last.id + 1);
        entry.id = id;
        entries.push(entry);
        id
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogStore for MemoryLogStore {
    fn query(
        &self,
        location: &str,
        since: i64,
        min_severity: Severity,
    ) -> LogStoreResult<Vec<LogEntry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| LogStoreError::Unavailable("memory store lock poisoned".to_string()))?;

        let mut matching: Vec<LogEntry> = entries
            .iter()
            .filter(|entry| {
                entry.location == location
                    && entry.timestamp >= since
                    && entry.severity >= min_severity
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(matching)
    }
}
