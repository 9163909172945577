//! Reporting module for probe results
//!
//! This module handles:
//! - The per-URL outcome records produced by the crawl
//! - Deterministic ordering and CSV export
//! - Consolidating outcomes into error groups
//! - Run summaries on stdout and as markdown

mod analysis;
mod export;
mod markdown;
mod summary;

pub use analysis::{consolidate, format_analysis, ConsolidatedError, GroupBy};
pub use export::{export_csv, format_messages, write_csv, CSV_HEADER, MESSAGE_SEPARATOR};
pub use markdown::{format_markdown_report, write_markdown_report};
pub use summary::{print_summary, RunSummary};

use crate::crawler::FetchStatus;
use crate::logs::LogMessage;
use crate::sources::CandidateUrl;
use thiserror::Error;

/// Errors that can occur while writing reports
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// The result of one attempted fetch
///
/// Created once per fetched URL and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub candidate: CandidateUrl,
    pub status: FetchStatus,

    /// Log entries recorded for the URL during the run, newest first
    pub log_messages: Vec<LogMessage>,
}

impl FetchOutcome {
    pub fn new(candidate: CandidateUrl, status: FetchStatus, log_messages: Vec<LogMessage>) -> Self {
        Self {
            candidate,
            status,
            log_messages,
        }
    }

    /// True if the outcome belongs in the error analysis
    pub fn has_errors(&self) -> bool {
        !self.log_messages.is_empty() || self.status.is_server_or_transport_error()
    }
}

/// Sorts outcomes by source, subsource and URL
pub fn sort_outcomes(outcomes: &mut [FetchOutcome]) {
    outcomes.sort_by(|a, b| a.candidate.canonical_cmp(&b.candidate));
}
