//! Link extraction for the crawl
//!
//! Turns an HTML page into the internal links worth fetching next.
//!
//! # Link Rules
//!
//! **Skipped hrefs:**
//! - Empty, query-only (`?…`) and anchor-only (`#…`)
//! - Any scheme other than `http:`/`https:` (`mailto:`, `javascript:`, …)
//! - Anchors inside the administration toolbar
//!
//! **Resolution** (after normalization):
//! - `/` → the base origin
//! - `/path` → base origin + path
//! - `http(s)://…` → unchanged
//! - anything else → relative to the current page
//!
//! **Rejected targets:**
//! - Hosts other than the base origin's host
//! - Paths whose last segment has an extension other than `html`

use crate::url::{host_of, normalize};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Id of the administration toolbar subtree
const ADMIN_TOOLBAR_ID: &str = "toolbar-administration";

/// Extracts the internal links of a page, normalized and in document order
///
/// # Arguments
///
/// * `html` - The page body
/// * `page_url` - Normalized URL of the page the body came from
/// * `base_origin` - Origin of the site under test
///
/// # Example
///
/// ```
/// use siteprobe::crawler::extract_links;
///
/// let html = r#"<a href="/about/">About</a> <a href="mailto:x@example.com">Mail</a>"#;
/// let links = extract_links(html, "https://example.com/home", "https://example.com");
/// assert_eq!(links, vec!["https://example.com/about".to_string()]);
/// ```
pub fn extract_links(html: &str, page_url: &str, base_origin: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let base_origin = base_origin.trim_end_matches('/').to_lowercase();
    let base_host = host_of(&base_origin);
    let mut links: Vec<String> = Vec::new();

    for element in document.select(&selector) {
        if in_admin_toolbar(&element) {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(resolved) = resolve_href(href, page_url, &base_origin) else {
            continue;
        };

        if host_of(&resolved) != base_host {
            continue;
        }

        if has_non_html_extension(&resolved) {
            continue;
        }

        if !links.contains(&resolved) {
            links.push(resolved);
        }
    }

    links
}

/// Returns true if the element sits inside the administration toolbar
fn in_admin_toolbar(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().id() == Some(ADMIN_TOOLBAR_ID))
}

/// Resolves an href to a normalized absolute URL
///
/// Returns `None` for hrefs that are never followed.
fn resolve_href(href: &str, page_url: &str, base_origin: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('?') || href.starts_with('#') {
        return None;
    }

    let href = match href.split_once('#') {
        Some((before, _)) => before,
        None => href,
    };

    if let Some(scheme) = scheme_of(href) {
        if scheme != "http" && scheme != "https" {
            return None;
        }
    }

    let href = normalize(href);
    if href.is_empty() {
        return None;
    }

    let resolved = if href == "/" {
        base_origin.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        let scheme = base_origin.split("://").next().unwrap_or("https");
        format!("{}://{}", scheme, rest)
    } else if href.starts_with('/') {
        format!("{}{}", base_origin, href)
    } else if href.starts_with("http://") || href.starts_with("https://") {
        href
    } else {
        let page = Url::parse(&format!("{}/", page_url.trim_end_matches('/'))).ok()?;
        page.join(&href).ok()?.to_string()
    };

    Some(normalize(&resolved))
}

/// Returns the lowercased scheme if `href` starts with one
fn scheme_of(href: &str) -> Option<String> {
    let colon = href.find(':')?;
    let candidate = &href[..colon];

    if candidate.contains(|c: char| matches!(c, '/' | '?' | '#')) {
        return None;
    }

    let mut chars = candidate.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    valid.then(|| candidate.to_ascii_lowercase())
}

fn has_non_html_extension(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return true;
    };

    let last_segment = parsed.path().rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, extension)) => extension != "html",
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://example.com";
    const PAGE: &str = "https://example.com/section/page";

    fn links(body: &str) -> Vec<String> {
        extract_links(body, PAGE, ORIGIN)
    }

    #[test]
    fn test_skips_fragment_external_and_keeps_internal() {
        let html = r##"<html><body>
            <a href="/b">B</a>
            <a href="#frag">Jump</a>
            <a href="https://other.example/x">Elsewhere</a>
            <a href="/a">Self</a>
        </body></html>"##;
        assert_eq!(
            links(html),
            vec!["https://example.com/b", "https://example.com/a"]
        );
    }

    #[test]
    fn test_root_link_is_origin() {
        assert_eq!(links(r#"<a href="/">Home</a>"#), vec!["https://example.com"]);
    }

    #[test]
    fn test_relative_link_resolves_under_page() {
        assert_eq!(
            links(r#"<a href="child">Child</a>"#),
            vec!["https://example.com/section/page/child"]
        );
        assert_eq!(
            links(r#"<a href="../sibling">Sibling</a>"#),
            vec!["https://example.com/section/sibling"]
        );
    }

    #[test]
    fn test_query_is_dropped_and_query_only_skipped() {
        assert_eq!(
            links(r#"<a href="?page=2">Next</a><a href="/list?page=2">List</a>"#),
            vec!["https://example.com/list"]
        );
    }

    #[test]
    fn test_non_http_schemes_skipped() {
        let html = r#"
            <a href="mailto:someone@example.com">Mail</a>
            <a href="javascript:void(0)">JS</a>
            <a href="tel:+123">Call</a>
            <a href="HTTPS://EXAMPLE.com/Upper">Upper</a>
        "#;
        assert_eq!(links(html), vec!["https://example.com/upper"]);
    }

    #[test]
    fn test_extensions() {
        let html = r#"
            <a href="/files/report.pdf">PDF</a>
            <a href="/legacy/page.html">Legacy</a>
            <a href="/images/logo.PNG">Logo</a>
            <a href="/dotted.dir/page">Dir</a>
        "#;
        assert_eq!(
            links(html),
            vec![
                "https://example.com/legacy/page.html",
                "https://example.com/dotted.dir/page"
            ]
        );
    }

    #[test]
    fn test_admin_toolbar_ignored() {
        let html = r#"
            <div id="toolbar-administration"><nav><a href="/admin/content">Content</a></nav></div>
            <main><a href="/node/1">Node</a></main>
        "#;
        assert_eq!(links(html), vec!["https://example.com/node/1"]);
    }

    #[test]
    fn test_protocol_relative_and_other_host() {
        let html = r#"
            <a href="//example.com/shared">Shared</a>
            <a href="//cdn.example.com/lib">CDN</a>
            <a href="https://sub.example.com/x">Sub</a>
        "#;
        assert_eq!(links(html), vec!["https://example.com/shared"]);
    }

    #[test]
    fn test_duplicates_collapsed() {
        let html = r#"<a href="/b">1</a><a href="/B/">2</a><a href="/b#top">3</a>"#;
        assert_eq!(links(html), vec!["https://example.com/b"]);
    }

    #[test]
    fn test_scheme_of() {
        assert_eq!(scheme_of("mailto:x"), Some("mailto".to_string()));
        assert_eq!(scheme_of("/path:with-colon"), None);
        assert_eq!(scheme_of("relative"), None);
    }
}
