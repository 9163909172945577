use crate::config::types::{
    Config, CrawlConfig, FetchConfig, LogsConfig, ProviderConfig, ProviderKind, SessionConfig,
    SiteConfig,
};
use crate::url::parse_origin;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_fetch_config(&config.fetch)?;
    validate_crawl_config(&config.crawl)?;
    validate_session_config(&config.session)?;
    if let Some(logs) = &config.logs {
        validate_logs_config(logs)?;
    }
    validate_providers(&config.providers)?;
    Ok(())
}

/// Validates the site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    parse_origin(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if config.session_cookie_prefixes.is_empty()
        || config.session_cookie_prefixes.iter().any(|p| p.is_empty())
    {
        return Err(ConfigError::Validation(
            "session-cookie-prefixes must contain at least one non-empty prefix".to_string(),
        ));
    }

    if !config.logout_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "logout-path must start with '/', got '{}'",
            config.logout_path
        )));
    }

    if config.exclude_paths.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::Validation(
            "exclude-paths cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetch behavior
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    if config.timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-seconds must be >= 1, got {}",
            config.timeout_seconds
        )));
    }

    if config.max_redirects > 50 {
        return Err(ConfigError::Validation(format!(
            "max-redirects must be <= 50, got {}",
            config.max_redirects
        )));
    }

    Ok(())
}

/// Validates crawl behavior
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_depth > 10 {
        return Err(ConfigError::Validation(format!(
            "max-depth must be <= 10, got {}",
            config.max_depth
        )));
    }
    Ok(())
}

/// Validates that exactly one login source is configured
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    match (&config.login_url, &config.login_command) {
        (Some(_), Some(_)) => Err(ConfigError::Validation(
            "session must set either login-url or login-command, not both".to_string(),
        )),
        (None, None) => Err(ConfigError::Validation(
            "session must set login-url or login-command".to_string(),
        )),
        (Some(url), None) => {
            Url::parse(url)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid login-url: {}", e)))?;
            Ok(())
        }
        (None, Some(command)) => {
            if command.first().map_or(true, |program| program.is_empty()) {
                return Err(ConfigError::Validation(
                    "login-command must name a program".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Validates the log store section
fn validate_logs_config(config: &LogsConfig) -> Result<(), ConfigError> {
    if !is_sql_identifier(&config.table) {
        return Err(ConfigError::Validation(format!(
            "logs table '{}' is not a valid identifier",
            config.table
        )));
    }

    if config.redact_tokens.iter().any(|t| t.is_empty()) {
        return Err(ConfigError::Validation(
            "redact-tokens cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates provider entries
fn validate_providers(providers: &[ProviderConfig]) -> Result<(), ConfigError> {
    let mut ids = HashSet::new();

    for provider in providers {
        if provider.id.is_empty() || provider.id.contains(',') {
            return Err(ConfigError::Validation(format!(
                "provider id '{}' must be non-empty and cannot contain ','",
                provider.id
            )));
        }

        if matches!(provider.id.as_str(), "all" | "none") {
            return Err(ConfigError::Validation(format!(
                "provider id '{}' is reserved",
                provider.id
            )));
        }

        if !ids.insert(provider.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate provider id '{}'",
                provider.id
            )));
        }

        validate_provider_kind(&provider.id, &provider.kind)?;
    }

    Ok(())
}

fn validate_provider_kind(id: &str, kind: &ProviderKind) -> Result<(), ConfigError> {
    match kind {
        ProviderKind::List { .. } | ProviderKind::File { .. } => Ok(()),
        ProviderKind::Sitemap { url, .. } => {
            Url::parse(url).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid sitemap url for '{}': {}", id, e))
            })?;
            Ok(())
        }
        ProviderKind::Entity {
            table,
            id_column,
            bundle_column,
            status_column,
            path_template,
            limit,
            ..
        } => {
            let identifiers = [
                Some(table),
                Some(id_column),
                bundle_column.as_ref(),
                status_column.as_ref(),
            ];
            for identifier in identifiers.into_iter().flatten() {
                if !is_sql_identifier(identifier) {
                    return Err(ConfigError::Validation(format!(
                        "provider '{}': '{}' is not a valid identifier",
                        id, identifier
                    )));
                }
            }

            if !path_template.contains("{id}") {
                return Err(ConfigError::Validation(format!(
                    "provider '{}': path-template must contain {{id}}",
                    id
                )));
            }

            if *limit < 1 {
                return Err(ConfigError::Validation(format!(
                    "provider '{}': limit must be >= 1",
                    id
                )));
            }

            Ok(())
        }
    }
}

/// Checks that a table or column name is safe to splice into SQL
pub(crate) fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sql_identifier() {
        assert!(is_sql_identifier("watchdog"));
        assert!(is_sql_identifier("node_field_data"));
        assert!(is_sql_identifier("_x1"));

        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("1abc"));
        assert!(!is_sql_identifier("watchdog; DROP TABLE x"));
        assert!(!is_sql_identifier("a.b"));
    }

    #[test]
    fn test_session_requires_exactly_one_source() {
        let neither = SessionConfig {
            account_id: 1,
            login_url: None,
            login_command: None,
        };
        assert!(validate_session_config(&neither).is_err());

        let both = SessionConfig {
            account_id: 1,
            login_url: Some("https://example.com/login".to_string()),
            login_command: Some(vec!["drush".to_string()]),
        };
        assert!(validate_session_config(&both).is_err());

        let command = SessionConfig {
            account_id: 1,
            login_url: None,
            login_command: Some(vec!["drush".to_string(), "uli".to_string()]),
        };
        assert!(validate_session_config(&command).is_ok());
    }

    #[test]
    fn test_reserved_provider_ids() {
        let providers = vec![ProviderConfig {
            id: "all".to_string(),
            kind: ProviderKind::List {
                subsource: String::new(),
                urls: vec![],
            },
        }];
        assert!(validate_providers(&providers).is_err());
    }

    #[test]
    fn test_duplicate_provider_ids() {
        let list = || ProviderKind::List {
            subsource: String::new(),
            urls: vec![],
        };
        let providers = vec![
            ProviderConfig {
                id: "menu".to_string(),
                kind: list(),
            },
            ProviderConfig {
                id: "menu".to_string(),
                kind: list(),
            },
        ];
        assert!(validate_providers(&providers).is_err());
    }

    #[test]
    fn test_entity_template_needs_placeholder() {
        let kind = ProviderKind::Entity {
            database_path: "site.sqlite".into(),
            table: "node".to_string(),
            id_column: "nid".to_string(),
            bundle_column: None,
            status_column: None,
            path_template: "/node/".to_string(),
            limit: 10,
        };
        assert!(validate_provider_kind("node", &kind).is_err());
    }
}
