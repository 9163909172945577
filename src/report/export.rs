//! CSV export of fetch outcomes
//!
//! One fully quoted row per outcome, in the order given.

use crate::logs::LogMessage;
use crate::report::{FetchOutcome, ReportResult};
use csv::{QuoteStyle, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Header row of the export
pub const CSV_HEADER: [&str; 5] = [
    "source",
    "subsource",
    "http status code",
    "url",
    "message (type, severity, message)",
];

/// Separator between messages in one cell
pub const MESSAGE_SEPARATOR: &str = " | ";

/// Renders a message list as `type - severity - message` segments
pub fn format_messages(messages: &[LogMessage]) -> String {
    messages
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(MESSAGE_SEPARATOR)
}

/// Writes outcomes as CSV to any writer
pub fn write_csv<W: Write>(outcomes: &[FetchOutcome], writer: W) -> ReportResult<()> {
    let mut csv = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    csv.write_record(CSV_HEADER)?;
    for outcome in outcomes {
        csv.write_record([
            outcome.candidate.source.as_str(),
            outcome.candidate.subsource.as_str(),
            outcome.status.to_string().as_str(),
            outcome.candidate.url.as_str(),
            format_messages(&outcome.log_messages).as_str(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Writes outcomes to a CSV file
///
/// # Arguments
///
/// * `outcomes` - Outcomes in export order
/// * `path` - Destination file; replaced if it exists
pub fn export_csv(outcomes: &[FetchOutcome], path: &Path) -> ReportResult<()> {
    let file = File::create(path)?;
    write_csv(outcomes, file)?;
    tracing::info!("Wrote {} rows to {}", outcomes.len(), path.display());
    Ok(())
}
