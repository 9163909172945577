//! Server-side log correlation
//!
//! This module handles:
//! - Reading diagnostic entries from the site's log store
//! - Filtering them to one URL, one crawl window and a minimum severity
//! - Rendering message templates into a dedup key and a display form

mod correlator;
mod render;
mod sqlite;
mod store;

pub use correlator::LogCorrelator;
pub use render::{interpolate, redact, render_entry, strip_tags};
pub use sqlite::SqliteLogStore;
pub use store::{LogStore, MemoryLogStore};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while querying the log store
#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("Log database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid log table name: {0}")]
    InvalidTable(String),

    #[error("Log store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for log store operations
pub type LogStoreResult<T> = Result<T, LogStoreError>;

/// Log severity, ordered from least to most serious
///
/// The numeric representation used by the store follows RFC 5424, where
/// lower numbers are more serious (`Emergency` = 0, `Debug` = 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Severity {
    /// Returns the RFC 5424 level for this severity
    pub fn rfc_level(&self) -> i64 {
        match self {
            Self::Emergency => 0,
            Self::Alert => 1,
            Self::Critical => 2,
            Self::Error => 3,
            Self::Warning => 4,
            Self::Notice => 5,
            Self::Info => 6,
            Self::Debug => 7,
        }
    }

    /// Maps an RFC 5424 level back to a severity
    pub fn from_rfc_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(Self::Emergency),
            1 => Some(Self::Alert),
            2 => Some(Self::Critical),
            3 => Some(Self::Error),
            4 => Some(Self::Warning),
            5 => Some(Self::Notice),
            6 => Some(Self::Info),
            7 => Some(Self::Debug),
            _ => None,
        }
    }

    /// Lowercase name, as used in configuration and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Alert => "alert",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored log entry, as returned by a [`LogStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Insertion id; higher is newer
    pub id: i64,

    /// Channel or category the entry was logged under
    pub log_type: String,

    /// Message template with placeholders
    pub message: String,

    /// Placeholder values, keyed by placeholder including its sigil
    pub variables: BTreeMap<String, String>,

    pub severity: Severity,

    /// URL of the request that produced the entry
    pub location: String,

    /// Unix timestamp (seconds)
    pub timestamp: i64,
}

/// A log entry rendered for one fetched URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub log_type: String,
    pub severity: Severity,

    /// Template after redaction, before interpolation; used as a grouping key
    pub raw_message: String,

    /// Template with variables interpolated; used as a display example
    pub rendered_message: String,
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {}",
            self.log_type, self.severity, self.rendered_message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Emergency > Severity::Critical);
        assert!(Severity::Debug < Severity::Notice);
    }

    #[test]
    fn test_rfc_level_roundtrip_bounds() {
        assert_eq!(Severity::Warning.rfc_level(), 4);
        assert_eq!(Severity::from_rfc_level(3), Some(Severity::Error));
        assert_eq!(Severity::from_rfc_level(8), None);
        assert_eq!(Severity::from_rfc_level(-1), None);
    }

    #[test]
    fn test_log_message_display() {
        let message = LogMessage {
            log_type: "php".to_string(),
            severity: Severity::Error,
            raw_message: "Undefined index @name".to_string(),
            rendered_message: "Undefined index foo".to_string(),
        };
        assert_eq!(message.to_string(), "php - error - Undefined index foo");
    }
}
