//! Concrete URL providers
//!
//! | kind      | source      | subsource            |
//! |-----------|-------------|----------------------|
//! | `list`    | provider id | configured value     |
//! | `file`    | provider id | none                 |
//! | `sitemap` | provider id | none                 |
//! | `entity`  | provider id | bundle, when grouped |

use crate::sources::{ProvidedUrl, ProviderError, UrlProvider};
use async_trait::async_trait;
use reqwest::Client;
use rusqlite::{params, Connection, OpenFlags};
use scraper::{Html, Selector};
use std::path::PathBuf;

/// Inline list of URLs from the configuration
#[derive(Debug, Clone)]
pub struct ListProvider {
    id: String,
    subsource: String,
    urls: Vec<String>,
}

impl ListProvider {
    pub fn new(id: impl Into<String>, subsource: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            id: id.into(),
            subsource: subsource.into(),
            urls,
        }
    }
}

#[async_trait]
impl UrlProvider for ListProvider {
    async fn get_urls(&self) -> Result<Vec<ProvidedUrl>, ProviderError> {
        let subsource = Some(self.subsource.clone()).filter(|s| !s.is_empty());

        Ok(self
            .urls
            .iter()
            .map(|url| ProvidedUrl::new(&self.id, subsource.clone(), url))
            .collect())
    }
}

/// Newline-delimited URL file; blank lines and `#` comments are skipped
#[derive(Debug, Clone)]
pub struct FileProvider {
    id: String,
    path: PathBuf,
}

impl FileProvider {
    pub fn new(id: impl Into<String>, path: PathBuf) -> Self {
        Self {
            id: id.into(),
            path,
        }
    }
}

#[async_trait]
impl UrlProvider for FileProvider {
    async fn get_urls(&self) -> Result<Vec<ProvidedUrl>, ProviderError> {
        let content = tokio::fs::read_to_string(&self.path).await?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| ProvidedUrl::new(&self.id, None, line))
            .collect())
    }
}

/// URLs listed in a sitemap document, capped at `limit`
#[derive(Debug, Clone)]
pub struct SitemapProvider {
    id: String,
    url: String,
    limit: usize,
    client: Client,
}

impl SitemapProvider {
    pub fn new(id: impl Into<String>, url: impl Into<String>, limit: usize, client: Client) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            limit,
            client,
        }
    }
}

#[async_trait]
impl UrlProvider for SitemapProvider {
    async fn get_urls(&self) -> Result<Vec<ProvidedUrl>, ProviderError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let locations = parse_sitemap(&body, self.limit)?;
        tracing::debug!("Sitemap {} listed {} URLs", self.url, locations.len());

        Ok(locations
            .into_iter()
            .map(|loc| ProvidedUrl::new(&self.id, None, loc))
            .collect())
    }
}

/// Reads up to `limit` `<loc>` entries from a sitemap document
fn parse_sitemap(body: &str, limit: usize) -> Result<Vec<String>, ProviderError> {
    let document = Html::parse_document(body);
    let selector =
        Selector::parse("loc").map_err(|e| ProviderError::Other(format!("selector: {:?}", e)))?;

    Ok(document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|loc| !loc.is_empty())
        .take(limit)
        .collect())
}

/// Settings for [`EntityProvider`]
#[derive(Debug, Clone)]
pub struct EntityQuery {
    pub table: String,
    pub id_column: String,
    pub bundle_column: Option<String>,
    pub status_column: Option<String>,
    pub path_template: String,
    pub limit: usize,
}

/// The newest and oldest published rows of each bundle in an application
/// database, turned into paths through a template
///
/// Table and column names are validated as identifiers when the
/// configuration is loaded.
#[derive(Debug, Clone)]
pub struct EntityProvider {
    id: String,
    database_path: PathBuf,
    query: EntityQuery,
}

impl EntityProvider {
    pub fn new(id: impl Into<String>, database_path: PathBuf, query: EntityQuery) -> Self {
        Self {
            id: id.into(),
            database_path,
            query,
        }
    }
}

#[async_trait]
impl UrlProvider for EntityProvider {
    async fn get_urls(&self) -> Result<Vec<ProvidedUrl>, ProviderError> {
        let id = self.id.clone();
        let path = self.database_path.clone();
        let query = self.query.clone();

        tokio::task::spawn_blocking(move || {
            let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            query_entities(&conn, &id, &query)
        })
        .await
        .map_err(|e| ProviderError::Other(e.to_string()))?
    }
}

fn query_entities(
    conn: &Connection,
    source: &str,
    query: &EntityQuery,
) -> Result<Vec<ProvidedUrl>, ProviderError> {
    let published = query
        .status_column
        .as_ref()
        .map(|column| format!(" AND {} = 1", column))
        .unwrap_or_default();

    let bundles: Vec<Option<String>> = match &query.bundle_column {
        Some(column) => {
            let sql = format!(
                "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL{published} ORDER BY {col}",
                col = column,
                table = query.table,
                published = published,
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let bundles: Vec<Option<String>> =
                rows.map(|r| r.map(Some)).collect::<rusqlite::Result<_>>()?;
            bundles
        }
        None => vec![None],
    };

    let mut urls = Vec::new();
    for bundle in &bundles {
        for order in ["DESC", "ASC"] {
            for id in select_ids(conn, query, bundle.as_deref(), &published, order)? {
                urls.push(ProvidedUrl::new(
                    source,
                    bundle.clone(),
                    query.path_template.replace("{id}", &id.to_string()),
                ));
            }
        }
    }

    Ok(urls)
}

fn select_ids(
    conn: &Connection,
    query: &EntityQuery,
    bundle: Option<&str>,
    published: &str,
    order: &str,
) -> Result<Vec<i64>, ProviderError> {
    let limit = query.limit as i64;

    let ids = match (bundle, &query.bundle_column) {
        (Some(bundle), Some(column)) => {
            let sql = format!(
                "SELECT {id} FROM {table} WHERE {col} = ?1{published} ORDER BY {id} {order} LIMIT ?2",
                id = query.id_column,
                table = query.table,
                col = column,
                published = published,
                order = order,
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![bundle, limit], |row| row.get(0))?;
            let ids = rows.collect::<rusqlite::Result<Vec<i64>>>()?;
            ids
        }
        _ => {
            let sql = format!(
                "SELECT {id} FROM {table} WHERE 1 = 1{published} ORDER BY {id} {order} LIMIT ?1",
                id = query.id_column,
                table = query.table,
                published = published,
                order = order,
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit], |row| row.get(0))?;
            let ids = rows.collect::<rusqlite::Result<Vec<i64>>>()?;
            ids
        }
    };

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_list_provider() {
        let provider = ListProvider::new(
            "smoke",
            "front",
            vec!["/".to_string(), "/about".to_string()],
        );
        let urls = provider.get_urls().await.unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].source, "smoke");
        assert_eq!(urls[1].subsource.as_deref(), Some("front"));
    }

    #[tokio::test]
    async fn test_list_provider_empty_subsource() {
        let provider = ListProvider::new("smoke", "", vec!["/".to_string()]);
        let urls = provider.get_urls().await.unwrap();
        assert_eq!(urls[0].subsource, None);
    }

    #[tokio::test]
    async fn test_file_provider_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# regression set").unwrap();
        writeln!(file, "https://example.com/a").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  /b  ").unwrap();

        let provider = FileProvider::new("file", file.path().to_path_buf());
        let urls: Vec<String> = provider
            .get_urls()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.url)
            .collect();
        assert_eq!(urls, vec!["https://example.com/a", "/b"]);
    }

    #[tokio::test]
    async fn test_file_provider_missing_file() {
        let provider = FileProvider::new("file", PathBuf::from("/nonexistent/urls.txt"));
        assert!(matches!(
            provider.get_urls().await,
            Err(ProviderError::Io(_))
        ));
    }

    #[test]
    fn test_parse_sitemap_caps_entries() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://example.com/</loc></url>
              <url><loc> https://example.com/a </loc></url>
              <url><loc>https://example.com/b</loc></url>
            </urlset>"#;

        let locations = parse_sitemap(body, 2).unwrap();
        assert_eq!(
            locations,
            vec!["https://example.com/", "https://example.com/a"]
        );
    }

    fn create_entity_db() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let conn = Connection::open(file.path()).unwrap();
        conn.execute_batch(
            "CREATE TABLE node_field_data (nid INTEGER PRIMARY KEY, type TEXT, status INTEGER);",
        )
        .unwrap();
        for nid in 1..=6 {
            let bundle = if nid % 2 == 0 { "page" } else { "article" };
            let status = if nid == 5 { 0 } else { 1 };
            conn.execute(
                "INSERT INTO node_field_data (nid, type, status) VALUES (?1, ?2, ?3)",
                params![nid, bundle, status],
            )
            .unwrap();
        }
        file
    }

    #[tokio::test]
    async fn test_entity_provider_newest_and_oldest_per_bundle() {
        let db = create_entity_db();
        let provider = EntityProvider::new(
            "node",
            db.path().to_path_buf(),
            EntityQuery {
                table: "node_field_data".to_string(),
                id_column: "nid".to_string(),
                bundle_column: Some("type".to_string()),
                status_column: Some("status".to_string()),
                path_template: "/node/{id}".to_string(),
                limit: 1,
            },
        );

        let urls = provider.get_urls().await.unwrap();
        let got: Vec<(Option<&str>, &str)> = urls
            .iter()
            .map(|u| (u.subsource.as_deref(), u.url.as_str()))
            .collect();

        assert_eq!(
            got,
            vec![
                (Some("article"), "/node/3"),
                (Some("article"), "/node/1"),
                (Some("page"), "/node/6"),
                (Some("page"), "/node/2"),
            ]
        );
        assert!(urls.iter().all(|u| u.source == "node"));
    }

    #[tokio::test]
    async fn test_entity_provider_without_bundles() {
        let db = create_entity_db();
        let provider = EntityProvider::new(
            "node",
            db.path().to_path_buf(),
            EntityQuery {
                table: "node_field_data".to_string(),
                id_column: "nid".to_string(),
                bundle_column: None,
                status_column: None,
                path_template: "/node/{id}".to_string(),
                limit: 2,
            },
        );

        let urls: Vec<String> = provider
            .get_urls()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.url)
            .collect();
        assert_eq!(urls, vec!["/node/6", "/node/5", "/node/1", "/node/2"]);
    }
}
