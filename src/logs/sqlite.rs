//! SQLite log store
//!
//! Reads a watchdog-style table:
//!
//! | column      | type    | notes                                   |
//! |-------------|---------|-----------------------------------------|
//! | `wid`       | INTEGER | insertion id, newest is highest         |
//! | `type`      | TEXT    | channel                                 |
//! | `message`   | TEXT    | template with `@`/`%`/`:` placeholders  |
//! | `variables` | TEXT    | JSON object of placeholder values       |
//! | `severity`  | INTEGER | RFC 5424 level                          |
//! | `location`  | TEXT    | requested URL                           |
//! | `timestamp` | INTEGER | Unix seconds                            |

use crate::config::is_sql_identifier;
use crate::logs::{LogEntry, LogStore, LogStoreError, LogStoreResult, Severity};
use rusqlite::{params, Connection, OpenFlags, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// Log store backed by a SQLite database
pub struct SqliteLogStore {
    conn: Mutex<Connection>,
    query_sql: String,
}

impl SqliteLogStore {
    /// Opens the log database read-only
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `table` - Name of the log table
    pub fn open(path: &Path, table: &str) -> LogStoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::from_connection(conn, table)
    }

    /// Wraps an existing connection
    pub fn from_connection(conn: Connection, table: &str) -> LogStoreResult<Self> {
        if !is_sql_identifier(table) {
            return Err(LogStoreError::InvalidTable(table.to_string()));
        }

        let query_sql = format!(
            "SELECT wid, type, message, variables, severity, location, timestamp
             FROM {}
             WHERE location = ?1 AND timestamp >= ?2 AND severity <= ?3
             ORDER BY wid DESC",
            table
        );

        Ok(Self {
            conn: Mutex::new(conn),
            query_sql,
        })
    }
}

impl LogStore for SqliteLogStore {
    fn query(
        &self,
        location: &str,
        since: i64,
        min_severity: Severity,
    ) -> LogStoreResult<Vec<LogEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| LogStoreError::Unavailable("log connection lock poisoned".to_string()))?;

        let mut stmt = conn.prepare_cached(&self.query_sql)?;
        // Lower RFC levels are more serious.
        let rows = stmt.query_map(params![location, since, min_severity.rfc_level()], row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let id: i64 = row.get(0)?;
    let variables: Option<String> = row.get(3)?;
    let level: i64 = row.get(4)?;

    Ok(LogEntry {
        id,
        log_type: row.get(1)?,
        message: row.get(2)?,
        variables: parse_variables(id, variables.as_deref()),
        severity: Severity::from_rfc_level(level).unwrap_or(Severity::Debug),
        location: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

/// Decodes the JSON variables column
///
/// Non-string values are rendered with their JSON representation. Anything
/// that is not a JSON object decodes to no variables.
fn parse_variables(id: i64, raw: Option<&str>) -> BTreeMap<String, String> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return BTreeMap::new();
    };

    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw) {
        Ok(map) => map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect(),
        Err(e) => {
            tracing::debug!("Ignoring undecodable variables on log entry {}: {}", id, e);
            BTreeMap::new()
        }
    }
}
