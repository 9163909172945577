use crate::{UrlError, UrlResult};
use url::Url;

/// Returns the `scheme://host[:port]` origin of an absolute URL
///
/// The host is lowercased and default ports are omitted. Relative or
/// host-less input yields `None`.
///
/// # Examples
///
/// ```
/// use siteprobe::url::origin_of;
///
/// assert_eq!(origin_of("https://Example.com/path?q=1"), Some("https://example.com".to_string()));
/// assert_eq!(origin_of("http://127.0.0.1:8080/"), Some("http://127.0.0.1:8080".to_string()));
/// assert_eq!(origin_of("/relative"), None);
/// ```
pub fn origin_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    origin_of_url(&url)
}

/// Same as [`origin_of`] for an already parsed URL
pub fn origin_of_url(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();

    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Parses a user-supplied base URL into a bare origin
///
/// Only `http` and `https` are accepted, and a host is required. Any path,
/// query or fragment is discarded.
pub fn parse_origin(raw: &str) -> UrlResult<String> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    origin_of_url(&url).ok_or_else(|| UrlError::MissingHost(raw.to_string()))
}

/// Returns the lowercase host of an absolute URL
pub fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_lowercase()))
}

/// Replaces the origin of `raw` with `origin`, keeping path and query
///
/// Relative input is attached to `origin` as a path.
///
/// # Examples
///
/// ```
/// use siteprobe::url::rewrite_origin;
///
/// assert_eq!(
///     rewrite_origin("https://prod.example.com/node/1", "http://localhost:8080"),
///     "http://localhost:8080/node/1"
/// );
/// assert_eq!(rewrite_origin("about", "https://example.com"), "https://example.com/about");
/// ```
pub fn rewrite_origin(raw: &str, origin: &str) -> String {
    let raw = raw.trim();
    let origin = origin.trim_end_matches('/');

    match Url::parse(raw) {
        Ok(url) if url.has_host() => match url.query() {
            Some(query) => format!("{}{}?{}", origin, url.path(), query),
            None => format!("{}{}", origin, url.path()),
        },
        _ => attach_path(raw, origin),
    }
}

/// Makes `raw` absolute against `origin` if it is not already absolute
pub fn absolutize(raw: &str, origin: &str) -> String {
    let raw = raw.trim();

    match Url::parse(raw) {
        Ok(url) if url.has_host() => raw.to_string(),
        _ => attach_path(raw, origin.trim_end_matches('/')),
    }
}

fn attach_path(path: &str, origin: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", origin, path)
    } else {
        format!("{}/{}", origin, path)
    }
}
