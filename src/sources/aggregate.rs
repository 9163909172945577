//! URL aggregation
//!
//! Merges command-line URLs and provider output into the seed layer:
//!
//! 1. Resolve the provider selection (unknown names fail before any provider
//!    runs)
//! 2. Collect command-line URLs, then each provider's URLs in selection order;
//!    a failing provider is recorded and skipped
//! 3. Rewrite every URL onto the base-origin override, or derive the
//!    effective origin from the first non-empty URL
//! 4. Normalize, drop empties, dedup keeping the first occurrence
//! 5. Keep same-origin URLs, drop denylisted paths
//! 6. Sort by source, subsource, url

use crate::sources::{CandidateUrl, ProvidedUrl, ProviderRegistry};
use crate::url::{
    absolutize, has_excluded_path, is_same_origin, normalize, origin_of, parse_origin,
    rewrite_origin,
};
use crate::{ProbeError, ProviderFailure};
use futures::future::join_all;
use std::collections::HashSet;

/// Source tag for URLs given on the command line
pub const COMMAND_LINE_SOURCE: &str = "command line";

/// Which providers contribute to a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProviderSelection {
    #[default]
    All,
    None,
    Named(Vec<String>),
}

impl ProviderSelection {
    /// Parses `all`, `none`, an empty string or a comma-separated list of ids
    ///
    /// # Examples
    ///
    /// ```
    /// use siteprobe::sources::ProviderSelection;
    ///
    /// assert_eq!(ProviderSelection::parse(""), ProviderSelection::All);
    /// assert_eq!(ProviderSelection::parse("none"), ProviderSelection::None);
    /// assert_eq!(
    ///     ProviderSelection::parse("node, menu"),
    ///     ProviderSelection::Named(vec!["node".to_string(), "menu".to_string()])
    /// );
    /// ```
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            return Self::All;
        }
        if raw.eq_ignore_ascii_case("none") {
            return Self::None;
        }

        let names: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();

        if names.is_empty() {
            Self::All
        } else {
            Self::Named(names)
        }
    }
}

/// Result of one aggregation
#[derive(Debug, Default)]
pub struct Aggregation {
    /// The seed layer, deduplicated, origin-filtered and sorted
    pub candidates: Vec<CandidateUrl>,

    /// Providers that failed; their URLs are missing from `candidates`
    pub failures: Vec<ProviderFailure>,

    /// Origin the candidates were resolved against
    pub effective_origin: String,
}

/// Builds the seed layer for a run
pub struct Aggregator<'a> {
    registry: &'a ProviderRegistry,
    site_origin: String,
    exclude_paths: Vec<String>,
}

impl<'a> Aggregator<'a> {
    /// Creates an aggregator
    ///
    /// # Arguments
    ///
    /// * `registry` - Registered providers
    /// * `site_origin` - Origin of the site under test
    /// * `exclude_paths` - Path substrings that are never fetched
    pub fn new(registry: &'a ProviderRegistry, site_origin: &str, exclude_paths: &[String]) -> Self {
        Self {
            registry,
            site_origin: site_origin.trim_end_matches('/').to_lowercase(),
            exclude_paths: exclude_paths.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Aggregates command-line and provider URLs
    ///
    /// # Arguments
    ///
    /// * `cli_urls` - Comma-separated URLs from the command line
    /// * `selection` - Providers to run
    /// * `base_origin` - Origin override; every URL is rewritten onto it
    ///
    /// # Returns
    ///
    /// * `Ok(Aggregation)` - The seed layer and any isolated provider failures
    /// * `Err(ProbeError::UnknownProvider)` - The selection names an unknown provider
    /// * `Err(ProbeError::UrlError)` - The override is not an http(s) origin
    pub async fn aggregate(
        &self,
        cli_urls: Option<&str>,
        selection: &ProviderSelection,
        base_origin: Option<&str>,
    ) -> Result<Aggregation, ProbeError> {
        let providers = self.registry.select(selection)?;
        let override_origin = base_origin.map(parse_origin).transpose()?;

        let mut raw: Vec<ProvidedUrl> = cli_urls
            .filter(|urls| !urls.trim().is_empty())
            .map(split_cli_urls)
            .unwrap_or_default();

        let results = join_all(providers.iter().map(|(id, provider)| async move {
            tracing::debug!("Collecting URLs from provider '{}'", id);
            (id, provider.get_urls().await)
        }))
        .await;

        let mut failures = Vec::new();
        for (id, result) in results {
            match result {
                Ok(urls) => {
                    tracing::info!("Provider '{}' returned {} URLs", id, urls.len());
                    raw.extend(urls);
                }
                Err(e) => {
                    tracing::warn!("Provider '{}' failed: {}", id, e);
                    failures.push(ProviderFailure {
                        provider_id: id.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        let effective_origin = match override_origin {
            Some(origin) => {
                for entry in raw.iter_mut().filter(|e| !e.url.trim().is_empty()) {
                    entry.url = rewrite_origin(&entry.url, &origin);
                }
                origin
            }
            // A relative first URL leaves the site origin in effect.
            None => raw
                .iter()
                .find(|e| !e.url.trim().is_empty())
                .and_then(|e| origin_of(&e.url))
                .unwrap_or_else(|| self.site_origin.clone()),
        };
        tracing::debug!("Effective base origin: {}", effective_origin);

        let candidates = self.filter(raw, &effective_origin);
        tracing::info!(
            "Aggregated {} candidate URLs ({} provider failures)",
            candidates.len(),
            failures.len()
        );

        Ok(Aggregation {
            candidates,
            failures,
            effective_origin,
        })
    }

    fn filter(&self, raw: Vec<ProvidedUrl>, effective_origin: &str) -> Vec<CandidateUrl> {
        let origins = [self.site_origin.clone(), effective_origin.to_lowercase()];
        let mut seen = HashSet::new();

        let mut candidates: Vec<CandidateUrl> = raw
            .into_iter()
            .filter(|entry| !entry.url.trim().is_empty())
            .map(|entry| CandidateUrl {
                url: normalize(&absolutize(&entry.url, effective_origin)),
                source: entry.source,
                subsource: entry.subsource.unwrap_or_default(),
            })
            .filter(|candidate| !candidate.url.is_empty())
            .filter(|candidate| seen.insert(candidate.url.clone()))
            .filter(|candidate| {
                let keep = is_same_origin(&candidate.url, &origins);
                if !keep {
                    tracing::debug!("Dropping off-site URL {}", candidate.url);
                }
                keep
            })
            .filter(|candidate| !has_excluded_path(&candidate.url, &self.exclude_paths))
            .collect();

        candidates.sort_by(CandidateUrl::canonical_cmp);
        candidates
    }
}

fn split_cli_urls(urls: &str) -> Vec<ProvidedUrl> {
    urls.split(',')
        .map(|url| ProvidedUrl::new(COMMAND_LINE_SOURCE, None, url.trim()))
        .collect()
}
