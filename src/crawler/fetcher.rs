//! Authenticated HTTP fetcher
//!
//! This module handles all HTTP traffic of a run:
//! - Bootstrapping the privileged session from a one-time login URL
//! - Fetching pages with the session cookie attached
//! - Classifying transport failures
//! - Ending the session once fetching is over

use crate::config::{FetchConfig, SiteConfig};
use crate::session::{Session, SessionProvider};
use crate::url::rewrite_origin;
use crate::{ProbeError, SessionError};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{redirect::Policy, Client, Method};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a fetch produced no HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureCode {
    /// The request exceeded its timeout
    Timeout,
    /// The connection could not be established
    Connect,
    /// The redirect chain was too long or looped
    Redirect,
    /// The response body could not be read
    Body,
    /// Any other transport failure
    Request,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Redirect => "redirect",
            Self::Body => "body",
            Self::Request => "request",
        }
    }

    fn classify(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect
        } else if error.is_redirect() {
            Self::Redirect
        } else if error.is_body() || error.is_decode() {
            Self::Body
        } else {
            Self::Request
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome status of one fetch: an HTTP status code or a failure code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchStatus {
    Http(u16),
    Failed(FailureCode),
}

impl FetchStatus {
    /// True for transport failures and 5xx responses
    pub fn is_server_or_transport_error(&self) -> bool {
        match self {
            Self::Http(code) => *code >= 500,
            Self::Failed(_) => true,
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(code) => write!(f, "{}", code),
            Self::Failed(code) => write!(f, "{}", code),
        }
    }
}

/// A transport failure for one URL
///
/// Never fatal; the crawl records it as the outcome's status.
#[derive(Debug, Clone, Error)]
#[error("{code} error fetching {uri}: {cause}")]
pub struct FetchError {
    pub code: FailureCode,
    pub uri: String,
    pub cause: String,
}

impl FetchError {
    fn from_reqwest(uri: &str, error: reqwest::Error) -> Self {
        Self {
            code: FailureCode::classify(&error),
            uri: uri.to_string(),
            cause: error.to_string(),
        }
    }
}

/// A completed HTTP exchange, whatever its status
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,

    /// URL after redirects
    pub final_url: String,

    /// Whether the response declared an HTML content type (or none)
    pub is_html: bool,

    /// Response body; only read for GET requests
    pub body: Option<String>,
}

/// HTTP client bound to one site and one privileged session
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    client: Client,
    base_origin: String,
    cookie_prefixes: Vec<String>,
    logout_path: String,
    timeout: Duration,
    max_redirects: usize,
}

impl AuthenticatedClient {
    /// Builds the client for a site
    ///
    /// # Arguments
    ///
    /// * `base_origin` - Origin all session traffic is sent to
    /// * `fetch` - Timeout and redirect settings
    /// * `site` - Session cookie prefixes and logout path
    ///
    /// # Returns
    ///
    /// * `Ok(AuthenticatedClient)` - Successfully built client
    /// * `Err(reqwest::Error)` - Failed to build client
    pub fn new(
        base_origin: &str,
        fetch: &FetchConfig,
        site: &SiteConfig,
    ) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(fetch.timeout_seconds);
        let client = build_client(timeout, fetch.max_redirects, None)?;

        Ok(Self {
            client,
            base_origin: base_origin.trim_end_matches('/').to_string(),
            cookie_prefixes: site.session_cookie_prefixes.clone(),
            logout_path: site.logout_path.clone(),
            timeout,
            max_redirects: fetch.max_redirects,
        })
    }

    pub fn base_origin(&self) -> &str {
        &self.base_origin
    }

    /// Logs the privileged account in through a one-time login URL
    ///
    /// The issued URL is moved onto the client's base origin before it is
    /// requested, so site CLIs that print a placeholder host still work.
    ///
    /// # Returns
    ///
    /// * `Ok(Session)` - The session cookie set by the login
    /// * `Err(ProbeError::NoSessionCookie)` - No cookie with a session prefix
    /// * `Err(ProbeError::Session)` - The provider or the login request failed
    pub async fn bootstrap_session(
        &self,
        provider: &dyn SessionProvider,
        account_id: u64,
    ) -> Result<Session, ProbeError> {
        let issued = provider.issue_one_time_login(account_id).await?;
        let rewritten = rewrite_origin(issued.as_str(), &self.base_origin);
        let login_url = Url::parse(&rewritten).map_err(|source| SessionError::InvalidLoginUrl {
            url: rewritten.clone(),
            source,
        })?;

        tracing::info!("Logging in account {} via one-time login", account_id);

        let jar = Arc::new(Jar::default());
        let client = build_client(self.timeout, self.max_redirects, Some(Arc::clone(&jar)))?;

        let response = client
            .get(login_url.clone())
            .send()
            .await
            .map_err(|source| SessionError::Request {
                url: login_url.path().to_string(),
                source,
            })?;

        tracing::debug!(
            "One-time login answered {} at {}",
            response.status(),
            response.url()
        );

        let from_jar = jar
            .cookies(&login_url)
            .and_then(|value| value.to_str().ok().map(String::from))
            .and_then(|header| self.pick_session_cookie(header.split(';')));

        let session = from_jar.or_else(|| {
            let set_cookies: Vec<String> = response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .filter_map(|value| value.split(';').next().map(String::from))
                .collect();
            self.pick_session_cookie(set_cookies.iter().map(String::as_str))
        });

        match session {
            Some(session) => {
                tracing::info!("Session established ({})", session.cookie_name);
                Ok(session)
            }
            None => Err(ProbeError::NoSessionCookie {
                url: login_url.path().to_string(),
            }),
        }
    }

    /// Picks the first `name=value` pair whose name has a session prefix
    fn pick_session_cookie<'a>(&self, pairs: impl Iterator<Item = &'a str>) -> Option<Session> {
        pairs
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| {
                self.cookie_prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()))
            })
            .map(|(name, value)| Session::new(name, value))
    }

    /// Fetches one URL with the session cookie attached
    ///
    /// Every completed HTTP exchange is a response, including 4xx and 5xx.
    /// The body is read to the end for GET requests.
    pub async fn fetch(
        &self,
        url: &str,
        session: &Session,
        method: Method,
    ) -> Result<FetchResponse, FetchError> {
        let read_body = method == Method::GET;

        let response = self
            .client
            .request(method, url)
            .header(COOKIE, session.header_value())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |ct| ct.to_ascii_lowercase().contains("html"));

        let body = if read_body {
            Some(
                response
                    .text()
                    .await
                    .map_err(|e| FetchError::from_reqwest(url, e))?,
            )
        } else {
            None
        };

        Ok(FetchResponse {
            status,
            final_url,
            is_html,
            body,
        })
    }

    /// Invalidates the session by requesting the logout path
    pub async fn end_session(&self, session: &Session) -> Result<(), FetchError> {
        let logout_url = format!("{}{}", self.base_origin, self.logout_path);
        let response = self.fetch(&logout_url, session, Method::GET).await?;
        tracing::info!("Session ended (logout returned {})", response.status);
        Ok(())
    }

    /// Runs `work` inside a privileged session
    ///
    /// The session is bootstrapped first and ended exactly once after `work`
    /// completes. A failed logout is logged, not returned.
    pub async fn scoped<F, Fut, T>(
        &self,
        provider: &dyn SessionProvider,
        account_id: u64,
        work: F,
    ) -> Result<T, ProbeError>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = T>,
    {
        let session = self.bootstrap_session(provider, account_id).await?;
        let output = work(session.clone()).await;

        if let Err(e) = self.end_session(&session).await {
            tracing::warn!("Failed to end session: {}", e);
        }

        Ok(output)
    }
}

/// Builds a client following up to `max_redirects` http(s) redirects
fn build_client(
    timeout: Duration,
    max_redirects: usize,
    jar: Option<Arc<Jar>>,
) -> Result<Client, reqwest::Error> {
    let policy = Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.error("too many redirects")
        } else if !matches!(attempt.url().scheme(), "http" | "https") {
            attempt.stop()
        } else {
            attempt.follow()
        }
    });

    let mut builder = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .redirect(policy)
        .referer(true)
        .gzip(true)
        .brotli(true);

    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_client() -> AuthenticatedClient {
        let site = SiteConfig {
            base_url: "https://example.com".to_string(),
            session_cookie_prefixes: vec!["SESS".to_string(), "SSESS".to_string()],
            logout_path: "/user/logout".to_string(),
            exclude_paths: vec![],
        };
        AuthenticatedClient::new("https://example.com/", &FetchConfig::default(), &site).unwrap()
    }

    #[test]
    fn test_build_client() {
        let client = create_test_client();
        assert_eq!(client.base_origin(), "https://example.com");
        assert_eq!(client.max_redirects, 20);
        assert_eq!(client.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_pick_session_cookie() {
        let client = create_test_client();
        let header = "has_js=1; SSESS4f2a=abc123; SESSother=zzz";
        let session = client.pick_session_cookie(header.split(';')).unwrap();
        assert_eq!(session.cookie_name, "SSESS4f2a");
        assert_eq!(session.cookie_value, "abc123");
    }

    #[test]
    fn test_pick_session_cookie_none() {
        let client = create_test_client();
        assert!(client
            .pick_session_cookie("has_js=1; theme=dark".split(';'))
            .is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(FetchStatus::Http(503).to_string(), "503");
        assert_eq!(FetchStatus::Failed(FailureCode::Timeout).to_string(), "timeout");
    }

    #[test]
    fn test_status_error_threshold() {
        assert!(FetchStatus::Http(500).is_server_or_transport_error());
        assert!(FetchStatus::Failed(FailureCode::Connect).is_server_or_transport_error());
        assert!(!FetchStatus::Http(404).is_server_or_transport_error());
    }
}
