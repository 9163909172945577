//! Log correlator
//!
//! Ties each fetched URL to the log entries recorded for it since the crawl
//! started.

use crate::config::LogsConfig;
use crate::logs::{
    render_entry, LogMessage, LogStore, LogStoreError, LogStoreResult, MemoryLogStore, Severity,
    SqliteLogStore,
};
use std::sync::Arc;

/// Looks up and renders log entries for fetched URLs
///
/// Cheap to clone; every in-flight fetch holds its own handle to the shared
/// store.
#[derive(Clone)]
pub struct LogCorrelator {
    store: Arc<dyn LogStore>,
    min_severity: Severity,
    redact_tokens: Arc<[String]>,
}

impl LogCorrelator {
    /// Creates a correlator over the given store
    ///
    /// # Arguments
    ///
    /// * `store` - The log store to query
    /// * `min_severity` - Default minimum severity for [`Self::messages_for`]
    /// * `redact_tokens` - Placeholders removed before interpolation
    pub fn new(store: Arc<dyn LogStore>, min_severity: Severity, redact_tokens: Vec<String>) -> Self {
        Self {
            store,
            min_severity,
            redact_tokens: redact_tokens.into(),
        }
    }

    /// A correlator over an empty store, for runs without a log database
    pub fn disabled() -> Self {
        Self::new(
            Arc::new(MemoryLogStore::new()),
            Severity::Warning,
            crate::config::default_redact_tokens(),
        )
    }

    /// Builds the correlator for a run
    ///
    /// Without a `[logs]` section every URL correlates to no messages.
    pub fn from_config(config: Option<&LogsConfig>) -> LogStoreResult<Self> {
        let Some(config) = config else {
            tracing::info!("No log database configured; log correlation disabled");
            return Ok(Self::disabled());
        };

        let store = SqliteLogStore::open(&config.database_path, &config.table)?;
        tracing::info!(
            "Correlating against {} (table {}, min severity {})",
            config.database_path.display(),
            config.table,
            config.min_severity
        );

        Ok(Self::new(
            Arc::new(store),
            config.min_severity,
            config.redact_tokens.clone(),
        ))
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// Returns rendered log messages for `url`, newest first
    ///
    /// Only entries with a timestamp at or after `since` and a severity of
    /// at least `min_severity` are returned. The store is queried on the
    /// blocking pool so slow queries do not stall in-flight fetches.
    pub async fn correlate(
        &self,
        url: &str,
        since: i64,
        min_severity: Severity,
    ) -> LogStoreResult<Vec<LogMessage>> {
        let store = Arc::clone(&self.store);
        let location = url.to_string();

        let entries = tokio::task::spawn_blocking(move || store.query(&location, since, min_severity))
            .await
            .map_err(|e| LogStoreError::Unavailable(e.to_string()))??;

        Ok(entries
            .iter()
            .map(|entry| render_entry(entry, &self.redact_tokens))
            .collect())
    }

    /// Same as [`Self::correlate`] with the configured minimum severity,
    /// degrading to an empty list when the store cannot be queried
    pub async fn messages_for(&self, url: &str, since: i64) -> Vec<LogMessage> {
        match self.correlate(url, since, self.min_severity).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Log query failed for {}: {}", url, e);
                Vec::new()
            }
        }
    }
}
