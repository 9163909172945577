//! URL sources
//!
//! This module handles:
//! - The provider capability interface and its concrete implementations
//! - A static registry mapping provider ids to providers built from config
//! - Aggregating command-line and provider URLs into the seed layer

mod aggregate;
mod providers;
mod registry;

pub use aggregate::{Aggregation, Aggregator, ProviderSelection, COMMAND_LINE_SOURCE};
pub use providers::{EntityProvider, FileProvider, ListProvider, SitemapProvider};
pub use registry::{build_provider, ProviderRegistry};

use async_trait::async_trait;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// A URL tagged with the collaborator that produced it
///
/// Within one run, uniqueness is defined by the normalized `url` alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateUrl {
    /// Producing collaborator, e.g. a provider id, "command line" or "crawl"
    pub source: String,

    /// Disambiguates within a source (a bundle name, or the referring page
    /// for crawled links)
    pub subsource: String,

    pub url: String,
}

impl CandidateUrl {
    pub fn new(
        source: impl Into<String>,
        subsource: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            subsource: subsource.into(),
            url: url.into(),
        }
    }

    /// Canonical report order: source, then subsource, then URL
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        (&self.source, &self.subsource, &self.url).cmp(&(
            &other.source,
            &other.subsource,
            &other.url,
        ))
    }
}

impl fmt::Display for CandidateUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subsource.is_empty() {
            write!(f, "[{}] {}", self.source, self.url)
        } else {
            write!(f, "[{} / {}] {}", self.source, self.subsource, self.url)
        }
    }
}

/// A record as returned by a provider, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedUrl {
    pub source: String,
    pub subsource: Option<String>,
    pub url: String,
}

impl ProvidedUrl {
    pub fn new(source: impl Into<String>, subsource: Option<String>, url: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            subsource,
            url: url.into(),
        }
    }
}

/// Errors a provider can raise while enumerating URLs
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Capability interface for URL sources
///
/// Implementations must be side-effect free; read-only queries against the
/// target application's own data are fine. Each provider applies its own
/// result cap.
#[async_trait]
pub trait UrlProvider: Send + Sync {
    /// Enumerates candidate URLs
    async fn get_urls(&self) -> Result<Vec<ProvidedUrl>, ProviderError>;
}
