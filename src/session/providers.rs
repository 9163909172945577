use crate::session::SessionProvider;
use crate::SessionError;
use async_trait::async_trait;
use tokio::process::Command;
use url::Url;

/// Placeholder replaced with the account id in login URLs and commands
const ACCOUNT_PLACEHOLDER: &str = "{account}";

/// Hands out a login URL fixed in the configuration
#[derive(Debug, Clone)]
pub struct StaticLoginProvider {
    url: String,
}

impl StaticLoginProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl SessionProvider for StaticLoginProvider {
    async fn issue_one_time_login(&self, account_id: u64) -> Result<Url, SessionError> {
        parse_login_url(&self.url.replace(ACCOUNT_PLACEHOLDER, &account_id.to_string()))
    }
}

/// Runs an external command that prints a one-time login URL
///
/// The first stdout line that looks like an http(s) URL is used.
#[derive(Debug, Clone)]
pub struct CommandLoginProvider {
    argv: Vec<String>,
}

impl CommandLoginProvider {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl SessionProvider for CommandLoginProvider {
    async fn issue_one_time_login(&self, account_id: u64) -> Result<Url, SessionError> {
        let account = account_id.to_string();
        let argv: Vec<String> = self
            .argv
            .iter()
            .map(|arg| arg.replace(ACCOUNT_PLACEHOLDER, &account))
            .collect();
        let command_line = argv.join(" ");

        let (program, args) = argv.split_first().ok_or_else(|| SessionError::Command {
            command: command_line.clone(),
            message: "empty command".to_string(),
        })?;

        tracing::debug!("Requesting one-time login via: {}", command_line);
        let output = Command::new(program).args(args).output().await?;

        if !output.status.success() {
            return Err(SessionError::Command {
                command: command_line,
                message: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with("http://") || line.starts_with("https://"))
            .ok_or(SessionError::NoLoginUrl)?;

        parse_login_url(line)
    }
}

fn parse_login_url(raw: &str) -> Result<Url, SessionError> {
    Url::parse(raw.trim()).map_err(|source| SessionError::InvalidLoginUrl {
        url: raw.to_string(),
        source,
    })
}
