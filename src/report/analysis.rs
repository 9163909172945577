//! Error consolidation
//!
//! Groups outcomes by an error signature so one PHP warning hit on fifty
//! pages shows up once, with its fifty URLs.

use crate::crawler::FetchStatus;
use crate::report::FetchOutcome;
use serde::Deserialize;
use std::collections::HashMap;

/// Grouping key for the analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    /// Raw message only
    Message,
    /// Source, status and raw message
    #[default]
    SourceStatusMessage,
}

/// A group of outcomes sharing an error signature
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedError {
    /// Set when grouping by source
    pub source: Option<String>,

    /// Set when grouping by status
    pub status: Option<FetchStatus>,

    /// Pre-interpolation message shared by the group
    pub raw_message: String,

    /// One rendered message from the group
    pub example: String,

    /// Distinct affected URLs, in first-seen order
    pub urls: Vec<String>,

    /// Number of occurrences
    pub count: usize,
}

type GroupKey = (Option<String>, Option<FetchStatus>, String);

/// Consolidates outcomes into error groups
///
/// Every log message counts as one occurrence. Outcomes without messages
/// still form a group when they failed or returned a 5xx status. Groups are
/// ordered by count, most frequent first, then by key.
pub fn consolidate(outcomes: &[FetchOutcome], group_by: GroupBy) -> Vec<ConsolidatedError> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<ConsolidatedError> = Vec::new();

    for outcome in outcomes {
        for (raw, rendered) in signatures(outcome) {
            let key = match group_by {
                GroupBy::Message => (None, None, raw),
                GroupBy::SourceStatusMessage => (
                    Some(outcome.candidate.source.clone()),
                    Some(outcome.status),
                    raw,
                ),
            };

            let slot = *index.entry(key.clone()).or_insert_with(|| {
                groups.push(ConsolidatedError {
                    source: key.0.clone(),
                    status: key.1,
                    raw_message: key.2.clone(),
                    example: rendered.clone(),
                    urls: Vec::new(),
                    count: 0,
                });
                groups.len() - 1
            });

            let group = &mut groups[slot];
            group.count += 1;
            if !group.urls.contains(&outcome.candidate.url) {
                group.urls.push(outcome.candidate.url.clone());
            }
        }
    }

    groups.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.status.cmp(&b.status))
            .then_with(|| a.raw_message.cmp(&b.raw_message))
    });
    groups
}

/// (raw, rendered) pairs an outcome contributes to the analysis
fn signatures(outcome: &FetchOutcome) -> Vec<(String, String)> {
    if !outcome.log_messages.is_empty() {
        return outcome
            .log_messages
            .iter()
            .map(|m| (m.raw_message.clone(), m.rendered_message.clone()))
            .collect();
    }

    match outcome.status {
        FetchStatus::Http(code) if code >= 500 => {
            let text = format!("HTTP {} with no log entries", code);
            vec![(text.clone(), text)]
        }
        FetchStatus::Failed(code) => {
            let text = format!("Request failed ({})", code);
            vec![(text.clone(), text)]
        }
        FetchStatus::Http(_) => Vec::new(),
    }
}

/// Formats error groups as plain text
pub fn format_analysis(groups: &[ConsolidatedError]) -> String {
    let mut out = String::new();

    if groups.is_empty() {
        out.push_str("No errors found.\n");
        return out;
    }

    for group in groups {
        let mut key = Vec::new();
        if let Some(source) = &group.source {
            key.push(source.clone());
        }
        if let Some(status) = &group.status {
            key.push(status.to_string());
        }
        key.push(group.raw_message.clone());

        out.push_str(&format!("[{}x] {}\n", group.count, key.join(" / ")));
        out.push_str(&format!("  Example: {}\n", group.example));
        out.push_str(&format!("  URLs ({}):\n", group.urls.len()));
        for url in &group.urls {
            out.push_str(&format!("    - {}\n", url));
        }
        out.push('\n');
    }

    out
}
