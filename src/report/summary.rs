//! Run summary
//!
//! Aggregate counts over a run's outcomes, printed at the end of a run and
//! embedded in the markdown report.

use crate::crawler::FetchStatus;
use crate::report::FetchOutcome;
use crate::ProviderFailure;
use std::collections::BTreeMap;

/// Summary statistics for one run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    // Run metadata
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub config_hash: String,
    pub base_origin: String,

    // Crawl shape
    pub layers: usize,
    pub total_urls: usize,

    // Status class ("2xx", "3xx", "4xx", "5xx", or a failure code) -> count
    pub status_classes: BTreeMap<String, usize>,

    // Log correlation
    pub urls_with_messages: usize,
    pub total_messages: usize,

    // Provider id -> cause
    pub provider_failures: Vec<(String, String)>,
}

impl RunSummary {
    /// Computes the outcome statistics; run metadata is left empty
    pub fn from_outcomes(outcomes: &[FetchOutcome]) -> Self {
        let mut summary = Self {
            total_urls: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            *summary
                .status_classes
                .entry(status_class(&outcome.status))
                .or_insert(0) += 1;

            if !outcome.log_messages.is_empty() {
                summary.urls_with_messages += 1;
                summary.total_messages += outcome.log_messages.len();
            }
        }

        summary
    }

    pub fn with_provider_failures(mut self, failures: &[ProviderFailure]) -> Self {
        self.provider_failures = failures
            .iter()
            .map(|f| (f.provider_id.clone(), f.cause.clone()))
            .collect();
        self
    }

    /// Outcomes with a 5xx status or a transport failure
    pub fn error_count(&self) -> usize {
        self.status_classes
            .iter()
            .filter(|(class, _)| class.as_str() == "5xx" || !class.ends_with("xx"))
            .map(|(_, count)| count)
            .sum()
    }

    /// Percentage of URLs that produced log messages
    pub fn message_rate(&self) -> f64 {
        if self.total_urls == 0 {
            return 0.0;
        }
        (self.urls_with_messages as f64 / self.total_urls as f64) * 100.0
    }
}

fn status_class(status: &FetchStatus) -> String {
    match status {
        FetchStatus::Http(code) => format!("{}xx", code / 100),
        FetchStatus::Failed(code) => code.to_string(),
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Siteprobe Summary ===\n");

    println!("Overview:");
    println!("  Base origin: {}", summary.base_origin);
    println!("  URLs fetched: {}", summary.total_urls);
    println!("  Layers: {}", summary.layers);
    if let Some(duration) = summary.duration_seconds {
        println!("  Duration: {}s", duration);
    }
    println!();

    println!("Responses:");
    for (class, count) in &summary.status_classes {
        println!("  {}: {}", class, count);
    }
    println!();

    println!("Log Correlation:");
    println!(
        "  URLs with log messages: {} ({:.1}%)",
        summary.urls_with_messages,
        summary.message_rate()
    );
    println!("  Total messages: {}", summary.total_messages);
    println!();

    if !summary.provider_failures.is_empty() {
        println!("Provider Failures:");
        for (id, cause) in &summary.provider_failures {
            println!("  - {}: {}", id, cause);
        }
        println!();
    }
}
