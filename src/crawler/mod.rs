//! Crawler module for authenticated fetching and link following
//!
//! This module contains the core probing logic, including:
//! - Session-scoped HTTP fetching with failure classification
//! - Link extraction from fetched pages
//! - The breadth-first crawl engine
//! - Overall run coordination from seed aggregation to sorted outcomes

mod engine;
mod fetcher;
mod links;

pub use crate::sources::CandidateUrl;
pub use engine::{CrawlEngine, CrawlRun, CrawlSettings, CRAWL_SOURCE};
pub use fetcher::{AuthenticatedClient, FailureCode, FetchError, FetchResponse, FetchStatus};
pub use links::extract_links;

use crate::config::Config;
use crate::logs::LogCorrelator;
use crate::report::{sort_outcomes, FetchOutcome};
use crate::session::SessionProvider;
use crate::sources::{Aggregation, Aggregator, ProviderRegistry, ProviderSelection};
use crate::ProviderFailure;
use chrono::{DateTime, Utc};

/// Per-run overrides, usually taken from the command line
#[derive(Debug, Clone, Default)]
pub struct ProbeRequest {
    /// Origin override; every seed URL is moved onto it
    pub base_url: Option<String>,

    /// Comma-separated seed URLs
    pub urls: Option<String>,

    /// Providers to run
    pub providers: ProviderSelection,

    /// Overrides `crawl.enabled`
    pub crawl: Option<bool>,

    /// Overrides `crawl.max-depth`
    pub depth: Option<u32>,
}

/// Everything a completed run produced
#[derive(Debug)]
pub struct ProbeRun {
    /// Sorted by source, subsource and URL
    pub outcomes: Vec<FetchOutcome>,

    /// Providers that failed during aggregation
    pub provider_failures: Vec<ProviderFailure>,

    /// Origin the run was sent to
    pub base_origin: String,

    /// Number of distinct URLs fetched or queued
    pub seen_count: usize,

    /// Number of layers fetched
    pub layers: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ProbeRun {
    /// Wall-clock duration of the run in whole seconds
    pub fn duration_seconds(&self) -> u64 {
        (self.finished_at - self.started_at).num_seconds().max(0) as u64
    }
}

/// Builds the seed layer without fetching anything
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `request` - Per-run overrides
/// * `registry` - Registered URL providers
///
/// # Returns
///
/// * `Ok(Aggregation)` - The sorted seed layer and any provider failures
/// * `Err(ProbeError)` - Unknown provider or invalid origin override
pub async fn aggregate_seeds(
    config: &Config,
    request: &ProbeRequest,
    registry: &ProviderRegistry,
) -> crate::Result<Aggregation> {
    let aggregator = Aggregator::new(registry, &config.site.base_url, &config.site.exclude_paths);
    aggregator
        .aggregate(
            request.urls.as_deref(),
            &request.providers,
            request.base_url.as_deref(),
        )
        .await
}

/// Runs a complete probe
///
/// This is the main entry point for a run. It will:
/// 1. Aggregate the seed layer from the command line and the providers
/// 2. Log the privileged account in
/// 3. Fetch the seeds and, if enabled, follow links layer by layer
/// 4. Correlate each fetch with the log entries it produced
/// 5. Log out and return the outcomes in canonical order
///
/// # Returns
///
/// * `Ok(ProbeRun)` - The run completed; per-URL failures are in the outcomes
/// * `Err(ProbeError)` - Aggregation or session bootstrap failed
pub async fn run_probe(
    config: &Config,
    request: &ProbeRequest,
    registry: &ProviderRegistry,
    session_provider: &dyn SessionProvider,
    correlator: LogCorrelator,
) -> crate::Result<ProbeRun> {
    let started_at = Utc::now();

    let aggregation = aggregate_seeds(config, request, registry).await?;
    for failure in &aggregation.failures {
        tracing::warn!("{}", failure);
    }
    tracing::info!(
        "Aggregated {} seed URLs for {}",
        aggregation.candidates.len(),
        aggregation.effective_origin
    );

    let client = AuthenticatedClient::new(&aggregation.effective_origin, &config.fetch, &config.site)?;
    let settings = CrawlSettings {
        concurrency: config.fetch.concurrency,
        crawl_enabled: request.crawl.unwrap_or(config.crawl.enabled),
        max_depth: request.depth.unwrap_or(config.crawl.max_depth),
        method: config.fetch.method.into(),
        exclude_paths: config
            .site
            .exclude_paths
            .iter()
            .map(|p| p.to_lowercase())
            .collect(),
    };
    let engine = CrawlEngine::new(client.clone(), correlator, settings);

    let seeds = aggregation.candidates;
    let engine = &engine;
    let crawl = client
        .scoped(session_provider, config.session.account_id, |session| async move {
            let since = Utc::now().timestamp();
            engine.run(&session, seeds, since).await
        })
        .await?;

    let mut outcomes = crawl.outcomes;
    sort_outcomes(&mut outcomes);

    Ok(ProbeRun {
        outcomes,
        provider_failures: aggregation.failures,
        base_origin: aggregation.effective_origin,
        seen_count: crawl.seen.len(),
        layers: crawl.layers,
        started_at,
        finished_at: Utc::now(),
    })
}
