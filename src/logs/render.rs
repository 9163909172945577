//! Log message rendering
//!
//! Turns a stored template plus its variables into the two forms the
//! reporter needs: the raw template (grouping key) and the interpolated text
//! (display example).

use crate::logs::{LogEntry, LogMessage};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Renders a stored entry into a [`LogMessage`]
///
/// Redaction runs before interpolation, so the values of redacted
/// placeholders never reach either form. Markup is stripped from both.
pub fn render_entry(entry: &LogEntry, redact_tokens: &[String]) -> LogMessage {
    let template = redact(&entry.message, redact_tokens);
    let rendered = interpolate(&template, &entry.variables);

    LogMessage {
        log_type: entry.log_type.clone(),
        severity: entry.severity,
        raw_message: strip_tags(&template),
        rendered_message: strip_tags(&rendered),
    }
}

/// Removes every occurrence of the given placeholder tokens from a template
///
/// # Examples
///
/// ```
/// use siteprobe::logs::redact;
///
/// let tokens = vec!["@backtrace_string".to_string()];
/// assert_eq!(redact("Error @message @backtrace_string", &tokens), "Error @message ");
/// ```
pub fn redact(template: &str, tokens: &[String]) -> String {
    tokens
        .iter()
        .filter(|token| !token.is_empty())
        .fold(template.to_string(), |acc, token| acc.replace(token.as_str(), ""))
}

/// Substitutes placeholder values into a template in a single pass
///
/// Placeholder keys include their sigil (`@name`, `%name`, `:name`). When
/// keys overlap, the longest one wins. Substituted values are not scanned
/// again.
///
/// # Examples
///
/// ```
/// use siteprobe::logs::interpolate;
/// use std::collections::BTreeMap;
///
/// let mut vars = BTreeMap::new();
/// vars.insert("@name".to_string(), "foo".to_string());
/// vars.insert("@name_long".to_string(), "bar".to_string());
/// assert_eq!(interpolate("@name and @name_long", &vars), "foo and bar");
/// ```
pub fn interpolate(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut keys: Vec<&str> = variables
        .keys()
        .map(String::as_str)
        .filter(|key| !key.is_empty())
        .collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(ch) = rest.chars().next() {
        match keys.iter().find(|key| rest.starts_with(**key)) {
            Some(key) => {
                output.push_str(&variables[*key]);
                rest = &rest[key.len()..];
            }
            None => {
                output.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }

    output
}

/// Strips markup tags and trims surrounding whitespace
///
/// # Examples
///
/// ```
/// use siteprobe::logs::strip_tags;
///
/// assert_eq!(strip_tags("<em class=\"placeholder\">Error</em>: boom "), "Error: boom");
/// ```
pub fn strip_tags(text: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

    tag.replace_all(text, "").trim().to_string()
}
