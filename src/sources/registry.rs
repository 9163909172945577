//! Provider registry
//!
//! Providers are registered once at process start, from configuration or
//! directly, and looked up by id afterwards.

use crate::config::{ProviderConfig, ProviderKind};
use crate::sources::providers::EntityQuery;
use crate::sources::{
    EntityProvider, FileProvider, ListProvider, ProviderSelection, SitemapProvider, UrlProvider,
};
use crate::ProbeError;
use reqwest::Client;
use std::sync::Arc;

/// Static mapping from provider id to provider, in registration order
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<(String, Arc<dyn UrlProvider>)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry holding every configured provider
    ///
    /// # Arguments
    ///
    /// * `providers` - The `[[provider]]` entries of the configuration
    /// * `client` - HTTP client used by providers that fetch remote documents
    pub fn from_config(providers: &[ProviderConfig], client: &Client) -> Self {
        let mut registry = Self::new();
        for config in providers {
            registry.register(&config.id, build_provider(config, client));
        }
        registry
    }

    /// Registers a provider, replacing any previous one with the same id
    pub fn register(&mut self, id: impl Into<String>, provider: Arc<dyn UrlProvider>) {
        let id = id.into();
        match self.providers.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = provider,
            None => self.providers.push((id, provider)),
        }
    }

    /// Registered ids, in registration order
    pub fn ids(&self) -> Vec<String> {
        self.providers.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn UrlProvider>> {
        self.providers
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, provider)| Arc::clone(provider))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Resolves a selection to providers
    ///
    /// Every name is checked before anything is returned, so an unknown name
    /// fails the whole selection.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<(String, Arc<dyn UrlProvider>)>)` - Selected providers
    /// * `Err(ProbeError::UnknownProvider)` - A name is not registered
    pub fn select(
        &self,
        selection: &ProviderSelection,
    ) -> Result<Vec<(String, Arc<dyn UrlProvider>)>, ProbeError> {
        match selection {
            ProviderSelection::All => Ok(self.providers.clone()),
            ProviderSelection::None => Ok(Vec::new()),
            ProviderSelection::Named(names) => {
                let mut selected: Vec<(String, Arc<dyn UrlProvider>)> = Vec::new();
                for name in names {
                    let provider = self.get(name).ok_or_else(|| ProbeError::UnknownProvider {
                        name: name.clone(),
                        available: self.ids(),
                    })?;
                    if !selected.iter().any(|(id, _)| id == name) {
                        selected.push((name.clone(), provider));
                    }
                }
                Ok(selected)
            }
        }
    }
}

/// Builds the provider for one configuration entry
pub fn build_provider(config: &ProviderConfig, client: &Client) -> Arc<dyn UrlProvider> {
    match &config.kind {
        ProviderKind::List { subsource, urls } => Arc::new(ListProvider::new(
            &config.id,
            subsource.as_str(),
            urls.clone(),
        )),
        ProviderKind::File { path } => Arc::new(FileProvider::new(&config.id, path.clone())),
        ProviderKind::Sitemap { url, limit } => Arc::new(SitemapProvider::new(
            &config.id,
            url.as_str(),
            *limit,
            client.clone(),
        )),
        ProviderKind::Entity {
            database_path,
            table,
            id_column,
            bundle_column,
            status_column,
            path_template,
            limit,
        } => Arc::new(EntityProvider::new(
            &config.id,
            database_path.clone(),
            EntityQuery {
                table: table.clone(),
                id_column: id_column.clone(),
                bundle_column: bundle_column.clone(),
                status_column: status_column.clone(),
                path_template: path_template.clone(),
                limit: *limit,
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn list(urls: &[&str]) -> Arc<dyn UrlProvider> {
        Arc::new(ListProvider::new(
            "test",
            "",
            urls.iter().map(|u| u.to_string()).collect(),
        ))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.is_empty());

        registry.register("node", list(&["/node/1"]));
        registry.register("menu", list(&["/"]));
        registry.register("node", list(&["/node/2"]));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["node", "menu"]);
        assert!(registry.get("menu").is_some());
        assert!(registry.get("views").is_none());
    }

    #[test]
    fn test_select_unknown_fails() {
        let mut registry = ProviderRegistry::new();
        registry.register("node", list(&[]));

        let selection = ProviderSelection::Named(vec!["node".to_string(), "bogus".to_string()]);
        match registry.select(&selection) {
            Err(ProbeError::UnknownProvider { name, available }) => {
                assert_eq!(name, "bogus");
                assert_eq!(available, vec!["node"]);
            }
            other => panic!("expected UnknownProvider, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_select_all_none_named() {
        let mut registry = ProviderRegistry::new();
        registry.register("a", list(&[]));
        registry.register("b", list(&[]));

        assert_eq!(registry.select(&ProviderSelection::All).unwrap().len(), 2);
        assert!(registry.select(&ProviderSelection::None).unwrap().is_empty());

        let named = ProviderSelection::Named(vec!["b".to_string(), "b".to_string()]);
        let selected = registry.select(&named).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, "b");
    }

    #[test]
    fn test_from_config() {
        let config = parse_config(
            r#"
[site]
base-url = "https://example.com"

[session]
login-url = "https://example.com/user/reset/1/abc"

[[provider]]
id = "smoke"
kind = "list"
urls = ["/"]

[[provider]]
id = "extra"
kind = "file"
path = "urls.txt"
"#,
        )
        .unwrap();

        let registry = ProviderRegistry::from_config(&config.providers, &Client::new());
        assert_eq!(registry.ids(), vec!["smoke", "extra"]);
    }
}
