//! Crawl engine - breadth-first layer loop
//!
//! Each layer is fetched through a bounded pool. Completions are tagged with
//! their index in the layer and folded into the run by the controlling task
//! once the layer has drained, so the seen-set and the next layer have a
//! single writer and completion order never shows in the results.

use crate::crawler::fetcher::{AuthenticatedClient, FetchStatus};
use crate::crawler::links::extract_links;
use crate::logs::LogCorrelator;
use crate::report::FetchOutcome;
use crate::session::Session;
use crate::sources::CandidateUrl;
use crate::url::{has_excluded_path, normalize, request_location};
use futures::stream::{self, StreamExt};
use reqwest::Method;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source tag for URLs discovered by following links
pub const CRAWL_SOURCE: &str = "crawl";

/// Pool and traversal settings
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Maximum number of in-flight fetches
    pub concurrency: usize,

    /// Follow links found on fetched pages
    pub crawl_enabled: bool,

    /// Last layer index; the seed layer is depth 0
    pub max_depth: u32,

    /// Method for layers whose bodies are not parsed
    pub method: Method,

    /// Path substrings of links that are never followed
    pub exclude_paths: Vec<String>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            crawl_enabled: false,
            max_depth: 1,
            method: Method::GET,
            exclude_paths: Vec::new(),
        }
    }
}

/// Everything a crawl produced
#[derive(Debug, Default)]
pub struct CrawlRun {
    /// One outcome per fetched URL, in layer then index order
    pub outcomes: Vec<FetchOutcome>,

    /// Every normalized URL fetched or queued
    pub seen: HashSet<String>,

    /// Number of layers fetched
    pub layers: usize,
}

/// An HTML body and the URL it was served from after redirects
struct FetchedPage {
    url: String,
    body: String,
}

/// Breadth-first crawler over one authenticated session
pub struct CrawlEngine {
    client: AuthenticatedClient,
    correlator: LogCorrelator,
    settings: CrawlSettings,
}

impl CrawlEngine {
    /// Creates an engine from its collaborators
    ///
    /// # Arguments
    ///
    /// * `client` - Fetches pages with the session cookie
    /// * `correlator` - Looks up log entries per fetched URL
    /// * `settings` - Pool size and traversal limits
    pub fn new(client: AuthenticatedClient, correlator: LogCorrelator, settings: CrawlSettings) -> Self {
        Self {
            client,
            correlator,
            settings,
        }
    }

    /// Runs the layer loop from a seed layer
    ///
    /// # Arguments
    ///
    /// * `session` - Credential attached to every fetch
    /// * `seeds` - Layer 0; duplicates by normalized URL are fetched once
    /// * `since` - Unix timestamp opening the log correlation window
    pub async fn run(&self, session: &Session, seeds: Vec<CandidateUrl>, since: i64) -> CrawlRun {
        let mut run = CrawlRun::default();
        let completed = AtomicUsize::new(0);

        let mut layer: Vec<CandidateUrl> = Vec::with_capacity(seeds.len());
        for mut seed in seeds {
            seed.url = normalize(&seed.url);
            if run.seen.insert(seed.url.clone()) {
                layer.push(seed);
            } else {
                tracing::debug!("Skipping duplicate seed {}", seed.url);
            }
        }

        let mut depth: u32 = 0;
        while !layer.is_empty() && depth <= self.settings.max_depth {
            let extract = self.settings.crawl_enabled && depth < self.settings.max_depth;
            let method = if extract {
                Method::GET
            } else {
                self.settings.method.clone()
            };

            tracing::info!("Layer {}: fetching {} URLs", depth, layer.len());
            let results = self
                .fetch_layer(&layer, session, method, since, &completed)
                .await;

            let mut next: Vec<CandidateUrl> = Vec::new();
            for (outcome, page) in results {
                if let Some(page) = page.filter(|_| extract) {
                    for link in extract_links(&page.body, &page.url, self.client.base_origin()) {
                        if has_excluded_path(&link, &self.settings.exclude_paths) {
                            continue;
                        }
                        if run.seen.insert(link.clone()) {
                            next.push(CandidateUrl::new(
                                CRAWL_SOURCE,
                                outcome.candidate.url.clone(),
                                link,
                            ));
                        }
                    }
                }
                run.outcomes.push(outcome);
            }

            run.layers += 1;
            if extract {
                tracing::info!("Layer {}: queued {} new links", depth, next.len());
            }

            layer = next;
            depth += 1;
        }

        tracing::info!(
            "Crawl finished: {} URLs fetched over {} layers",
            run.outcomes.len(),
            run.layers
        );
        run
    }

    /// Fetches one layer and returns its results in layer order
    async fn fetch_layer(
        &self,
        layer: &[CandidateUrl],
        session: &Session,
        method: Method,
        since: i64,
        completed: &AtomicUsize,
    ) -> Vec<(FetchOutcome, Option<FetchedPage>)> {
        let total = layer.len();

        let mut results: Vec<(usize, FetchOutcome, Option<FetchedPage>)> =
            stream::iter(layer.iter().enumerate())
                .map(|(index, candidate)| {
                    let method = method.clone();
                    async move {
                        let (outcome, page) = self.fetch_one(candidate, session, method, since).await;

                        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        if done % 10 == 0 {
                            tracing::info!("Progress: {} URLs fetched", done);
                        }
                        tracing::debug!(
                            "[{}/{}] {} {}",
                            index + 1,
                            total,
                            outcome.status,
                            outcome.candidate.url
                        );

                        (index, outcome, page)
                    }
                })
                .buffer_unordered(self.settings.concurrency.max(1))
                .collect()
                .await;

        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, outcome, page)| (outcome, page))
            .collect()
    }

    /// Fetches one URL and correlates its log entries
    async fn fetch_one(
        &self,
        candidate: &CandidateUrl,
        session: &Session,
        method: Method,
        since: i64,
    ) -> (FetchOutcome, Option<FetchedPage>) {
        let (status, page) = match self.client.fetch(&candidate.url, session, method).await {
            Ok(response) => {
                let page = match response.body {
                    Some(body) if response.is_html => Some(FetchedPage {
                        url: normalize(&response.final_url),
                        body,
                    }),
                    _ => None,
                };
                (FetchStatus::Http(response.status), page)
            }
            Err(e) => {
                tracing::warn!("{}", e);
                (FetchStatus::Failed(e.code), None)
            }
        };

        let location = request_location(&candidate.url);
        let log_messages = self.correlator.messages_for(&location, since).await;
        if !log_messages.is_empty() {
            tracing::debug!(
                "{} log messages for {}",
                log_messages.len(),
                candidate.url
            );
        }

        (
            FetchOutcome::new(candidate.clone(), status, log_messages),
            page,
        )
    }
}
