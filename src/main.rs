//! Siteprobe main entry point
//!
//! This is the command-line interface for the Siteprobe regression crawler.

use anyhow::Context;
use clap::Parser;
use dialoguer::{Confirm, Input};
use std::io::IsTerminal;
use std::path::PathBuf;
use siteprobe::config::{load_config_with_hash, Config};
use siteprobe::crawler::{aggregate_seeds, run_probe, ProbeRequest, ProbeRun};
use siteprobe::logs::LogCorrelator;
use siteprobe::report::{
    consolidate, export_csv, format_analysis, print_summary, write_markdown_report, RunSummary,
};
use siteprobe::sources::{ProviderRegistry, ProviderSelection};
use tracing_subscriber::EnvFilter;

/// Siteprobe: a regression crawler for a running web application
///
/// Siteprobe gathers URLs from the command line and from configured
/// providers, fetches them through one privileged session, optionally
/// follows internal links, and reports the server-side log entries each
/// fetch produced.
#[derive(Parser, Debug)]
#[command(name = "siteprobe")]
#[command(version)]
#[command(about = "A regression crawler with log correlation", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Origin to send every request to, overriding the configured site
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Comma-separated URLs to fetch
    #[arg(long, value_name = "URLS")]
    urls: Option<String>,

    /// Providers to run: "all", "none" or a comma-separated list of ids
    #[arg(long, value_name = "IDS")]
    providers: Option<String>,

    /// Follow internal links found on fetched pages
    #[arg(long)]
    crawl: bool,

    /// Number of link levels to follow beyond the seed URLs
    #[arg(long, value_name = "N")]
    depth: Option<u32>,

    /// Never prompt; use the configuration for anything not given
    #[arg(long)]
    non_interactive: bool,

    /// Show the URLs that would be fetched and exit
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn has_overrides(&self) -> bool {
        self.base_url.is_some()
            || self.urls.is_some()
            || self.providers.is_some()
            || self.crawl
            || self.depth.is_some()
    }

    fn to_request(&self) -> ProbeRequest {
        ProbeRequest {
            base_url: self.base_url.clone(),
            urls: self.urls.clone(),
            providers: self
                .providers
                .as_deref()
                .map(ProviderSelection::parse)
                .unwrap_or_default(),
            crawl: self.crawl.then_some(true),
            depth: self.depth,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let request = if cli.has_overrides() || cli.non_interactive || !std::io::stdin().is_terminal() {
        cli.to_request()
    } else {
        prompt_request(&config)?
    };

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(config.fetch.timeout_seconds))
        .build()
        .context("Failed to build provider HTTP client")?;
    let registry = ProviderRegistry::from_config(&config.providers, &http);
    tracing::info!("Registered providers: {}", registry.ids().join(", "));

    if cli.dry_run {
        handle_dry_run(&config, &request, &registry).await
    } else {
        handle_probe(&config, &config_hash, &request, &registry).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("siteprobe=info,warn"),
            1 => EnvFilter::new("siteprobe=debug,info"),
            2 => EnvFilter::new("siteprobe=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Asks for each run option, defaulting to the configuration
fn prompt_request(config: &Config) -> anyhow::Result<ProbeRequest> {
    let base_url: String = Input::new()
        .with_prompt("Base URL")
        .default(config.site.base_url.clone())
        .interact_text()?;

    let urls: String = Input::new()
        .with_prompt("URLs to fetch (comma-separated)")
        .allow_empty(true)
        .interact_text()?;

    let providers: String = Input::new()
        .with_prompt("Providers (all, none or ids)")
        .default("all".to_string())
        .interact_text()?;

    let crawl = Confirm::new()
        .with_prompt("Follow links?")
        .default(config.crawl.enabled)
        .interact()?;

    let depth = if crawl {
        let depth: u32 = Input::new()
            .with_prompt("Crawl depth")
            .default(config.crawl.max_depth)
            .interact_text()?;
        Some(depth)
    } else {
        None
    };

    Ok(ProbeRequest {
        base_url: base_url_override(&base_url, &config.site.base_url),
        urls: Some(urls),
        providers: ProviderSelection::parse(&providers),
        crawl: Some(crawl),
        depth,
    })
}

/// Returns the entered base URL only when it differs from the configured one
fn base_url_override(entered: &str, configured: &str) -> Option<String> {
    let entered = entered.trim().trim_end_matches('/');
    let configured = configured.trim().trim_end_matches('/');

    if entered.is_empty() || entered.eq_ignore_ascii_case(configured) {
        None
    } else {
        Some(entered.to_string())
    }
}

/// Handles the --dry-run mode: aggregates and lists the seed URLs
async fn handle_dry_run(
    config: &Config,
    request: &ProbeRequest,
    registry: &ProviderRegistry,
) -> anyhow::Result<()> {
    let aggregation = aggregate_seeds(config, request, registry).await?;

    println!("=== Siteprobe Dry Run ===\n");
    println!("Base origin: {}", aggregation.effective_origin);
    println!(
        "Crawl: {} (max depth {})",
        request.crawl.unwrap_or(config.crawl.enabled),
        request.depth.unwrap_or(config.crawl.max_depth)
    );

    if !aggregation.failures.is_empty() {
        println!("\nProvider Failures ({}):", aggregation.failures.len());
        for failure in &aggregation.failures {
            println!("  - {}", failure);
        }
    }

    println!("\nSeed URLs ({}):", aggregation.candidates.len());
    for candidate in &aggregation.candidates {
        println!("  {}", candidate);
    }

    Ok(())
}

/// Handles the main probe operation
async fn handle_probe(
    config: &Config,
    config_hash: &str,
    request: &ProbeRequest,
    registry: &ProviderRegistry,
) -> anyhow::Result<()> {
    let session_provider = siteprobe::session::from_config(&config.session)?;
    let correlator = LogCorrelator::from_config(config.logs.as_ref())?;

    let run = match run_probe(config, request, registry, session_provider.as_ref(), correlator).await
    {
        Ok(run) => {
            tracing::info!("Probe completed: {} URLs fetched", run.outcomes.len());
            run
        }
        Err(e) => {
            tracing::error!("Probe failed: {}", e);
            return Err(e.into());
        }
    };

    export_csv(&run.outcomes, &config.report.csv_path)?;

    let groups = consolidate(&run.outcomes, config.report.group_by);
    println!("{}", format_analysis(&groups));

    let summary = build_summary(&run, config_hash);
    print_summary(&summary);

    if let Some(path) = &config.report.analysis_path {
        write_markdown_report(&summary, &groups, path)?;
        println!("✓ Analysis written to: {}", path.display());
    }
    println!("✓ Report written to: {}", config.report.csv_path.display());

    Ok(())
}

fn build_summary(run: &ProbeRun, config_hash: &str) -> RunSummary {
    let mut summary =
        RunSummary::from_outcomes(&run.outcomes).with_provider_failures(&run.provider_failures);
    summary.started_at = run.started_at.to_rfc3339();
    summary.finished_at = Some(run.finished_at.to_rfc3339());
    summary.duration_seconds = Some(run.duration_seconds());
    summary.config_hash = config_hash.to_string();
    summary.base_origin = run.base_origin.clone();
    summary.layers = run.layers;
    summary
}
