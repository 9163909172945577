//! Integration tests for the probe
//!
//! These tests use wiremock to stand in for the site under test and drive
//! a full run end-to-end: login, layered fetching, log correlation, logout.

use siteprobe::config::{parse_config, Config};
use siteprobe::crawler::{run_probe, FailureCode, FetchStatus, ProbeRequest};
use siteprobe::logs::{LogCorrelator, LogEntry, LogStore, MemoryLogStore, Severity};
use siteprobe::sources::{ProviderRegistry, ProviderSelection};
use siteprobe::{normalize, ProbeError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const SESSION_COOKIE: &str = "SESSabc123=secret";

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, timeout_seconds: u64) -> Config {
    let toml = format!(
        r#"
[site]
base-url = "{base}"

[fetch]
concurrency = 4
timeout-seconds = {timeout}

[session]
login-url = "{base}/user/reset/{{account}}/token"
"#,
        base = base_url,
        timeout = timeout_seconds
    );
    parse_config(&toml).expect("test config is valid")
}

fn create_request(urls: &[String], crawl: bool, depth: u32) -> ProbeRequest {
    ProbeRequest {
        base_url: None,
        urls: Some(urls.join(",")),
        providers: ProviderSelection::None,
        crawl: Some(crawl),
        depth: Some(depth),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body).into_bytes(),
        "text/html; charset=utf-8",
    )
}

/// Mounts the one-time login and the logout endpoints
async fn mount_session(server: &MockServer, logouts: u64) {
    Mock::given(method("GET"))
        .and(path("/user/reset/1/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{}; path=/; HttpOnly", SESSION_COOKIE).as_str()),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/logout"))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(ResponseTemplate::new(200))
        .expect(logouts)
        .mount(server)
        .await;
}

/// Records a log entry for every request it answers, like a site whose
/// error handler writes to its log table
struct LoggingResponder {
    store: Arc<MemoryLogStore>,
    base: String,
    status: u16,
}

impl Respond for LoggingResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        // The site logs the requested URL as it saw it
        let location = format!("{}{}", self.base, request.url.path());
        let now = chrono::Utc::now().timestamp();

        let mut variables = BTreeMap::new();
        variables.insert("@key".to_string(), "title".to_string());

        self.store.record(LogEntry {
            id: 0,
            log_type: "php".to_string(),
            message: "Undefined index <em>@key</em>".to_string(),
            variables,
            severity: Severity::Error,
            location: location.clone(),
            timestamp: now,
        });
        self.store.record(LogEntry {
            id: 0,
            log_type: "php".to_string(),
            message: "Cache rebuilt".to_string(),
            variables: BTreeMap::new(),
            severity: Severity::Debug,
            location,
            timestamp: now,
        });

        ResponseTemplate::new(self.status).insert_header("content-type", "text/html")
    }
}

#[tokio::test]
async fn test_crawl_follows_internal_links_once() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_session(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(html(
            r##"<a href="/b">B</a>
                <a href="#frag">Fragment</a>
                <a href="https://other.example/x">External</a>
                <a href="/a/">Self</a>
                <a href="/user/logout">Log out</a>
                <a href="/files/report.pdf">PDF</a>"##,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(html(r#"<a href="/c">C</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(html(""))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&base, 10);
    let provider = siteprobe::session::from_config(&config.session).unwrap();
    let request = create_request(&[format!("{}/a", base)], true, 1);

    let run = run_probe(
        &config,
        &request,
        &ProviderRegistry::new(),
        provider.as_ref(),
        LogCorrelator::disabled(),
    )
    .await
    .unwrap();

    assert_eq!(run.layers, 2);
    assert_eq!(run.seen_count, 2);
    assert_eq!(run.outcomes.len(), 2);

    let seed = &run.outcomes[0];
    assert_eq!(seed.candidate.source, "command line");
    assert_eq!(seed.candidate.url, normalize(&format!("{}/a", base)));
    assert_eq!(seed.status, FetchStatus::Http(200));

    let crawled = &run.outcomes[1];
    assert_eq!(crawled.candidate.source, "crawl");
    assert_eq!(crawled.candidate.subsource, seed.candidate.url);
    assert_eq!(crawled.candidate.url, normalize(&format!("{}/b", base)));
}

#[tokio::test]
async fn test_depth_zero_fetches_only_seeds() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_session(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(r#"<a href="/b">B</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html(""))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&base, 10);
    let provider = siteprobe::session::from_config(&config.session).unwrap();
    let request = create_request(&[format!("{}/a", base)], true, 0);

    let run = run_probe(
        &config,
        &request,
        &ProviderRegistry::new(),
        provider.as_ref(),
        LogCorrelator::disabled(),
    )
    .await
    .unwrap();

    assert_eq!(run.layers, 1);
    assert_eq!(run.outcomes.len(), 1);
}

#[tokio::test]
async fn test_depth_two_stops_after_three_layers() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_session(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(r#"<a href="/b">B</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html(r#"<a href="/c">C</a> <a href="/a">Back</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(html(r#"<a href="/d">D</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(html(""))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&base, 10);
    let provider = siteprobe::session::from_config(&config.session).unwrap();
    let request = create_request(&[format!("{}/a", base)], true, 2);

    let run = run_probe(
        &config,
        &request,
        &ProviderRegistry::new(),
        provider.as_ref(),
        LogCorrelator::disabled(),
    )
    .await
    .unwrap();

    assert_eq!(run.layers, 3);
    assert_eq!(run.seen_count, 3);
    assert_eq!(run.outcomes.len(), 3);
    assert!(run.outcomes.iter().all(|o| !o.candidate.url.ends_with("/d")));
}

#[tokio::test]
async fn test_links_resolve_against_redirect_target() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_session(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/docs/intro"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/intro"))
        .respond_with(html(r#"<a href="next">Next</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/intro/next"))
        .respond_with(html(""))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/go/next"))
        .respond_with(html(""))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&base, 10);
    let provider = siteprobe::session::from_config(&config.session).unwrap();
    let request = create_request(&[format!("{}/go", base)], true, 1);

    let run = run_probe(
        &config,
        &request,
        &ProviderRegistry::new(),
        provider.as_ref(),
        LogCorrelator::disabled(),
    )
    .await
    .unwrap();

    assert_eq!(run.outcomes.len(), 2);
    let crawled = &run.outcomes[1];
    assert_eq!(crawled.candidate.source, "crawl");
    assert_eq!(crawled.candidate.subsource, normalize(&format!("{}/go", base)));
    assert_eq!(crawled.candidate.url, normalize(&format!("{}/docs/intro/next", base)));
}

#[tokio::test]
async fn test_missing_session_cookie_is_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/user/reset/1/token"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "has_js=1; path=/"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(""))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&base, 10);
    let provider = siteprobe::session::from_config(&config.session).unwrap();
    let request = create_request(&[format!("{}/a", base)], false, 0);

    let result = run_probe(
        &config,
        &request,
        &ProviderRegistry::new(),
        provider.as_ref(),
        LogCorrelator::disabled(),
    )
    .await;

    assert!(matches!(result, Err(ProbeError::NoSessionCookie { .. })));
}

#[tokio::test]
async fn test_unknown_provider_is_fatal_before_login() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&base, 10);
    let provider = siteprobe::session::from_config(&config.session).unwrap();
    let request = ProbeRequest {
        providers: ProviderSelection::parse("missing"),
        ..ProbeRequest::default()
    };

    let result = run_probe(
        &config,
        &request,
        &ProviderRegistry::new(),
        provider.as_ref(),
        LogCorrelator::disabled(),
    )
    .await;

    assert!(matches!(result, Err(ProbeError::UnknownProvider { .. })));
}

#[tokio::test]
async fn test_log_entries_correlated_with_fetch() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_session(&server, 1).await;

    let store = Arc::new(MemoryLogStore::new());

    // An entry from before the run must not be reported
    store.record(LogEntry {
        id: 0,
        log_type: "php".to_string(),
        message: "Stale warning".to_string(),
        variables: BTreeMap::new(),
        severity: Severity::Error,
        location: format!("{}/broken", base),
        timestamp: 0,
    });

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(LoggingResponder {
            store: Arc::clone(&store),
            base: base.clone(),
            status: 500,
        })
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fine"))
        .respond_with(html(""))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&base, 10);
    let provider = siteprobe::session::from_config(&config.session).unwrap();
    let request = create_request(
        &[format!("{}/fine", base), format!("{}/broken", base)],
        false,
        1,
    );
    let correlator = LogCorrelator::new(
        Arc::clone(&store) as Arc<dyn LogStore>,
        Severity::Warning,
        vec!["@uri".to_string()],
    );

    let run = run_probe(
        &config,
        &request,
        &ProviderRegistry::new(),
        provider.as_ref(),
        correlator,
    )
    .await
    .unwrap();

    assert_eq!(run.outcomes.len(), 2);

    let broken = &run.outcomes[0];
    assert!(broken.candidate.url.ends_with("/broken"));
    assert_eq!(broken.status, FetchStatus::Http(500));
    assert_eq!(broken.log_messages.len(), 1);
    assert_eq!(broken.log_messages[0].raw_message, "Undefined index @key");
    assert_eq!(broken.log_messages[0].rendered_message, "Undefined index title");
    assert_eq!(broken.log_messages[0].severity, Severity::Error);

    let fine = &run.outcomes[1];
    assert!(fine.candidate.url.ends_with("/fine"));
    assert!(fine.log_messages.is_empty());
}

#[tokio::test]
async fn test_site_root_correlated_with_fetch() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_session(&server, 1).await;

    let store = Arc::new(MemoryLogStore::new());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(LoggingResponder {
            store: Arc::clone(&store),
            base: base.clone(),
            status: 200,
        })
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&base, 10);
    let provider = siteprobe::session::from_config(&config.session).unwrap();
    let request = create_request(&[format!("{}/", base)], false, 0);
    let correlator = LogCorrelator::new(
        Arc::clone(&store) as Arc<dyn LogStore>,
        Severity::Warning,
        Vec::new(),
    );

    let run = run_probe(
        &config,
        &request,
        &ProviderRegistry::new(),
        provider.as_ref(),
        correlator,
    )
    .await
    .unwrap();

    assert_eq!(run.outcomes.len(), 1);
    assert_eq!(run.outcomes[0].candidate.url, normalize(&base));
    assert_eq!(run.outcomes[0].log_messages.len(), 1);
    assert_eq!(run.outcomes[0].log_messages[0].rendered_message, "Undefined index title");
}

#[tokio::test]
async fn test_timeout_recorded_as_outcome() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_session(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(html(""))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&base, 1);
    let provider = siteprobe::session::from_config(&config.session).unwrap();
    let request = create_request(&[format!("{}/slow", base), format!("{}/fast", base)], false, 0);

    let run = run_probe(
        &config,
        &request,
        &ProviderRegistry::new(),
        provider.as_ref(),
        LogCorrelator::disabled(),
    )
    .await
    .unwrap();

    assert_eq!(run.outcomes.len(), 2);
    assert_eq!(run.outcomes[0].status, FetchStatus::Http(200));
    assert_eq!(run.outcomes[1].status, FetchStatus::Failed(FailureCode::Timeout));
}
