//! Privileged session handling
//!
//! This module handles:
//! - The session provider interface, which issues one-time login URLs
//! - Static and command-backed providers
//! - The session credential carried by every fetch

mod providers;

pub use providers::{CommandLoginProvider, StaticLoginProvider};

use crate::config::SessionConfig;
use crate::SessionError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Issues one-time login URLs for a privileged account
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns a URL that logs `account_id` in when requested once
    async fn issue_one_time_login(&self, account_id: u64) -> Result<Url, SessionError>;
}

/// The session credential obtained from a one-time login
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub cookie_name: String,
    pub cookie_value: String,
}

impl Session {
    pub fn new(cookie_name: impl Into<String>, cookie_value: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            cookie_value: cookie_value.into(),
        }
    }

    /// Value for the `Cookie` request header
    pub fn header_value(&self) -> String {
        format!("{}={}", self.cookie_name, self.cookie_value)
    }
}

// The cookie value is a credential and stays out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cookie_name", &self.cookie_name)
            .field("cookie_value", &"<redacted>")
            .finish()
    }
}

/// Builds the session provider described by the configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn SessionProvider>)` - The configured provider
/// * `Err(SessionError::NoLoginUrl)` - Neither a login URL nor a command is set
pub fn from_config(config: &SessionConfig) -> Result<Arc<dyn SessionProvider>, SessionError> {
    if let Some(command) = config.login_command.as_ref().filter(|c| !c.is_empty()) {
        return Ok(Arc::new(CommandLoginProvider::new(command.clone())));
    }

    match &config.login_url {
        Some(url) => Ok(Arc::new(StaticLoginProvider::new(url.clone()))),
        None => Err(SessionError::NoLoginUrl),
    }
}
