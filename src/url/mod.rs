//! URL handling module for Siteprobe
//!
//! This module provides URL normalization and the origin helpers used by the
//! aggregator and the crawl engine to decide what counts as "the same site".

mod normalize;
mod origin;

pub use normalize::normalize;
pub use origin::{absolutize, host_of, origin_of, origin_of_url, parse_origin, rewrite_origin};

/// Returns true if `url` belongs to one of the given origins
///
/// Comparison is on the normalized origin, so scheme and host case do not
/// matter.
///
/// # Examples
///
/// ```
/// use siteprobe::url::is_same_origin;
///
/// let origins = ["https://example.com".to_string()];
/// assert!(is_same_origin("https://EXAMPLE.com/page", &origins));
/// assert!(!is_same_origin("https://other.com/page", &origins));
/// ```
pub fn is_same_origin(url: &str, origins: &[String]) -> bool {
    match origin_of(url) {
        Some(origin) => origins.iter().any(|o| o.eq_ignore_ascii_case(&origin)),
        None => false,
    }
}

/// Returns true if the path of `url` contains any of the given substrings
///
/// Input that does not parse as a URL is matched as a whole.
pub fn has_excluded_path(url: &str, excluded: &[String]) -> bool {
    let path = ::url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    excluded
        .iter()
        .any(|pattern| !pattern.is_empty() && path.contains(pattern.as_str()))
}

/// Returns the URL in the form it is requested, as the site records it
///
/// Normalized origins have no trailing slash, but the request for them is
/// `GET /`, so the site root is logged as `scheme://host/`. Input that does
/// not parse is returned unchanged.
///
/// # Examples
///
/// ```
/// use siteprobe::url::request_location;
///
/// assert_eq!(request_location("https://example.com"), "https://example.com/");
/// assert_eq!(request_location("https://example.com/node/1"), "https://example.com/node/1");
/// ```
pub fn request_location(url: &str) -> String {
    ::url::Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}
