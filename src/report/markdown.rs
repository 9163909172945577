//! Markdown report generation
//!
//! Writes the run summary and the consolidated error analysis as one
//! human-readable markdown document.

use crate::report::{ConsolidatedError, ReportResult, RunSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Maximum URLs listed per error group
const MAX_URLS_PER_GROUP: usize = 25;

/// Writes the markdown report
///
/// # Arguments
///
/// * `summary` - The run summary
/// * `groups` - Consolidated errors, in display order
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(ReportError)` - Failed to write the report
pub fn write_markdown_report(
    summary: &RunSummary,
    groups: &[ConsolidatedError],
    output_path: &Path,
) -> ReportResult<()> {
    let markdown = format_markdown_report(summary, groups);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Wrote analysis to {}", output_path.display());
    Ok(())
}

/// Formats the run summary and error groups as markdown
pub fn format_markdown_report(summary: &RunSummary, groups: &[ConsolidatedError]) -> String {
    let mut md = String::new();

    md.push_str("# Siteprobe Run Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Base Origin**: {}\n", summary.base_origin));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **URLs Fetched**: {}\n", summary.total_urls));
    md.push_str(&format!("- **Layers**: {}\n", summary.layers));
    md.push_str(&format!(
        "- **URLs With Log Messages**: {} ({:.2}%)\n",
        summary.urls_with_messages,
        summary.message_rate()
    ));
    md.push_str(&format!("- **Log Messages**: {}\n", summary.total_messages));
    md.push_str(&format!("- **Server Errors**: {}\n\n", summary.error_count()));

    if !summary.status_classes.is_empty() {
        md.push_str("## Responses\n\n");
        md.push_str("| Status | Count |\n");
        md.push_str("|--------|-------|\n");
        for (class, count) in &summary.status_classes {
            md.push_str(&format!("| {} | {} |\n", class, count));
        }
        md.push('\n');
    }

    if !summary.provider_failures.is_empty() {
        md.push_str("## Provider Failures\n\n");
        for (id, cause) in &summary.provider_failures {
            md.push_str(&format!("- **{}**: {}\n", id, cause));
        }
        md.push('\n');
    }

    md.push_str("## Errors\n\n");
    if groups.is_empty() {
        md.push_str("No errors found.\n");
        return md;
    }

    for group in groups {
        let mut heading = Vec::new();
        if let Some(source) = &group.source {
            heading.push(source.clone());
        }
        if let Some(status) = &group.status {
            heading.push(status.to_string());
        }

        if heading.is_empty() {
            md.push_str(&format!("### {} occurrence(s)\n\n", group.count));
        } else {
            md.push_str(&format!(
                "### {} ({} occurrence(s))\n\n",
                heading.join(" / "),
                group.count
            ));
        }

        md.push_str(&format!("- **Message**: `{}`\n", group.raw_message));
        md.push_str(&format!("- **Example**: {}\n", group.example));
        md.push_str(&format!("- **Affected URLs**: {}\n\n", group.urls.len()));

        for url in group.urls.iter().take(MAX_URLS_PER_GROUP) {
            md.push_str(&format!("  - {}\n", url));
        }
        if group.urls.len() > MAX_URLS_PER_GROUP {
            md.push_str(&format!(
                "\n  ... and {} more\n",
                group.urls.len() - MAX_URLS_PER_GROUP
            ));
        }
        md.push('\n');
    }

    md
}
