use crate::logs::Severity;
use crate::report::GroupBy;
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Siteprobe
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub logs: Option<LogsConfig>,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default, rename = "provider")]
    pub providers: Vec<ProviderConfig>,
}

/// The site under test
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Origin the site is served from (scheme, host and optional port)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Cookie name prefixes that identify the session cookie
    #[serde(
        rename = "session-cookie-prefixes",
        default = "default_session_cookie_prefixes"
    )]
    pub session_cookie_prefixes: Vec<String>,

    /// Path requested at the end of the run to invalidate the session
    #[serde(rename = "logout-path", default = "default_logout_path")]
    pub logout_path: String,

    /// Path substrings that are never fetched
    #[serde(rename = "exclude-paths", default = "default_exclude_paths")]
    pub exclude_paths: Vec<String>,
}

/// HTTP request behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of in-flight requests
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-seconds", default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Maximum number of redirects followed per request
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Request method used when the body is not needed for link extraction
    #[serde(default)]
    pub method: RequestMethod,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_seconds: default_timeout_seconds(),
            max_redirects: default_max_redirects(),
            method: RequestMethod::default(),
        }
    }
}

/// Request method for fetched pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    #[default]
    Get,
    Head,
}

impl From<RequestMethod> for reqwest::Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Head => reqwest::Method::HEAD,
        }
    }
}

/// Link-following behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Follow internal links found on fetched pages
    #[serde(default)]
    pub enabled: bool,

    /// Number of link levels followed beyond the seed layer
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_depth: default_max_depth(),
        }
    }
}

/// How the privileged one-time login URL is obtained
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Account the one-time login is issued for
    #[serde(rename = "account-id", default = "default_account_id")]
    pub account_id: u64,

    /// A ready-made one-time login URL
    #[serde(rename = "login-url", default)]
    pub login_url: Option<String>,

    /// Command whose output contains a one-time login URL; `{account}` is
    /// replaced with the account id
    #[serde(rename = "login-command", default)]
    pub login_command: Option<Vec<String>>,
}

/// Server-side log store used for correlation
#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
    /// Path to the SQLite database holding the log table
    #[serde(rename = "database-path")]
    pub database_path: PathBuf,

    /// Name of the log table
    #[serde(default = "default_log_table")]
    pub table: String,

    /// Entries below this severity are ignored
    #[serde(rename = "min-severity", default = "default_min_severity")]
    pub min_severity: Severity,

    /// Placeholders removed from message templates before interpolation
    #[serde(rename = "redact-tokens", default = "default_redact_tokens")]
    pub redact_tokens: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Path of the CSV export
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: PathBuf,

    /// Path of the markdown analysis, if one should be written
    #[serde(rename = "analysis-path", default)]
    pub analysis_path: Option<PathBuf>,

    /// Grouping key for the error analysis
    #[serde(rename = "group-by", default)]
    pub group_by: GroupBy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            analysis_path: None,
            group_by: GroupBy::default(),
        }
    }
}

/// A registered URL source
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Identifier used on the command line to select this provider
    pub id: String,

    /// Provider implementation and its settings
    #[serde(flatten)]
    pub kind: ProviderKind,
}

/// Provider implementations and their settings
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderKind {
    /// Inline list of URLs
    List {
        #[serde(default)]
        subsource: String,
        urls: Vec<String>,
    },

    /// Newline-delimited URL file
    File { path: PathBuf },

    /// Sitemap XML document
    Sitemap {
        url: String,
        #[serde(default = "default_provider_limit")]
        limit: usize,
    },

    /// Newest and oldest rows per bundle from an application database
    Entity {
        #[serde(rename = "database-path")]
        database_path: PathBuf,
        table: String,
        #[serde(rename = "id-column")]
        id_column: String,
        #[serde(rename = "bundle-column", default)]
        bundle_column: Option<String>,
        #[serde(rename = "status-column", default)]
        status_column: Option<String>,
        #[serde(rename = "path-template")]
        path_template: String,
        #[serde(default = "default_provider_limit")]
        limit: usize,
    },
}

fn default_session_cookie_prefixes() -> Vec<String> {
    vec!["SESS".to_string(), "SSESS".to_string()]
}

fn default_logout_path() -> String {
    "/user/logout".to_string()
}

fn default_exclude_paths() -> Vec<String> {
    vec!["/user/logout".to_string()]
}

fn default_concurrency() -> usize {
    8
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_max_redirects() -> usize {
    20
}

fn default_max_depth() -> u32 {
    1
}

fn default_account_id() -> u64 {
    1
}

fn default_log_table() -> String {
    "watchdog".to_string()
}

fn default_min_severity() -> Severity {
    Severity::Warning
}

pub(crate) fn default_redact_tokens() -> Vec<String> {
    vec![
        "@backtrace_string".to_string(),
        "@uri".to_string(),
        "@uuid".to_string(),
    ]
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("siteprobe-report.csv")
}

fn default_provider_limit() -> usize {
    10
}
