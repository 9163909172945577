//! Siteprobe: a regression crawler for a running web application
//!
//! This crate gathers URLs from pluggable sources, fetches them through a single
//! privileged session, optionally follows internal links breadth-first, and
//! correlates each fetch with the server-side log entries it produced.

pub mod config;
pub mod crawler;
pub mod logs;
pub mod report;
pub mod session;
pub mod sources;
pub mod url;

use thiserror::Error;

/// Main error type for Siteprobe operations
///
/// Only the variants raised before or around the crawl are fatal. Per-URL
/// failures are captured as data in [`report::FetchOutcome`] instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Unknown URL provider '{name}' (available: {})", available.join(", "))]
    UnknownProvider {
        name: String,
        available: Vec<String>,
    },

    #[error("No session cookie returned by one-time login at {url}")]
    NoSessionCookie { url: String },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Errors raised while obtaining or ending the privileged session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Login command {command:?} failed: {message}")]
    Command { command: String, message: String },

    #[error("Login command produced no URL")]
    NoLoginUrl,

    #[error("Invalid one-time login URL '{url}': {source}")]
    InvalidLoginUrl {
        url: String,
        source: ::url::ParseError,
    },

    #[error("Login request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single source provider failed; the remaining providers still run
#[derive(Debug, Error)]
#[error("URL provider '{provider_id}' failed: {cause}")]
pub struct ProviderFailure {
    pub provider_id: String,
    pub cause: String,
}

/// Result type alias for Siteprobe operations
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CandidateUrl, CrawlEngine, FetchError, FetchStatus, FailureCode};
pub use logs::{LogCorrelator, LogMessage, Severity};
pub use report::{ConsolidatedError, FetchOutcome, GroupBy};
pub use crate::url::normalize;
