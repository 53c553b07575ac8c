//! Client for the workspace (Notion) API.

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::http::{FetchError, HttpClient};

pub mod properties;

mod mapping;
pub use mapping::{PropertyMapping, Transaction, WorkspaceTodo};

pub const NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// Largest page size the query endpoint accepts
const QUERY_PAGE_SIZE: u32 = 100;

/// Error type for workspace calls
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace page {0} not found")]
    PageNotFound(String),

    #[error("workspace request failed: {0}")]
    Fetch(#[from] FetchError),
}

/// A workspace page with its raw property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_edited_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Page {
    /// The raw value of the named property
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// The named property as plain text
    pub fn text(&self, name: &str) -> Option<String> {
        self.property(name).and_then(properties::plain_text)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WorkspaceClient {
    http: HttpClient,
    token: String,
    base_url: String,
}

impl WorkspaceClient {
    pub fn new(http: HttpClient, token: impl Into<String>) -> Self {
        Self::with_base_url(http, token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: HttpClient, token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, client: &reqwest::Client, method: Method, path: &str) -> RequestBuilder {
        client
            .request(method, format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    fn page_error(page_id: &str, err: FetchError) -> WorkspaceError {
        match err.status() {
            Some(StatusCode::NOT_FOUND) => WorkspaceError::PageNotFound(page_id.to_string()),
            _ => WorkspaceError::Fetch(err),
        }
    }

    /// Returns every page of a database matching `filter`, following pagination
    ///
    /// ### Arguments
    ///
    /// * `database_id` - The database to query
    /// * `filter` - An optional filter object in the workspace's filter syntax
    #[instrument(skip(self, filter))]
    pub async fn query_database(&self, database_id: &str, filter: Option<Value>) -> Result<Vec<Page>, WorkspaceError> {
        let path = format!("databases/{}/query", database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({"page_size": QUERY_PAGE_SIZE});
            if let Some(filter) = &filter {
                body["filter"] = filter.clone();
            }
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let response: QueryResponse = self
                .http
                .fetch_json(|c| self.request(c, Method::POST, &path).json(&body))
                .await?;
            pages.extend(response.results);

            match (response.has_more, response.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        debug!(count = pages.len(), "Queried workspace database");
        Ok(pages)
    }

    #[instrument(skip(self))]
    pub async fn retrieve_page(&self, page_id: &str) -> Result<Page, WorkspaceError> {
        let path = format!("pages/{}", page_id);
        self.http
            .fetch_json(|c| self.request(c, Method::GET, &path))
            .await
            .map_err(|e| Self::page_error(page_id, e))
    }

    /// Creates a page in a database and returns it
    #[instrument(skip(self, properties))]
    pub async fn create_page(&self, database_id: &str, properties: Map<String, Value>) -> Result<Page, WorkspaceError> {
        let body = json!({
            "parent": {"database_id": database_id},
            "properties": properties,
        });
        let page: Page = self
            .http
            .fetch_json(|c| self.request(c, Method::POST, "pages").json(&body))
            .await?;
        info!(page_id = %page.id, "Created workspace page");
        Ok(page)
    }

    /// Sets the given properties on a page; properties not listed are untouched
    #[instrument(skip(self, properties))]
    pub async fn update_page(&self, page_id: &str, properties: Map<String, Value>) -> Result<Page, WorkspaceError> {
        let path = format!("pages/{}", page_id);
        let body = json!({"properties": properties});
        let page = self
            .http
            .fetch_json(|c| self.request(c, Method::PATCH, &path).json(&body))
            .await
            .map_err(|e| Self::page_error(page_id, e))?;
        debug!("Updated workspace page");
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn archive_page(&self, page_id: &str) -> Result<(), WorkspaceError> {
        let path = format!("pages/{}", page_id);
        let body = json!({"archived": true});
        self.http
            .send(|c| self.request(c, Method::PATCH, &path).json(&body))
            .await
            .map_err(|e| Self::page_error(page_id, e))?;
        info!("Archived workspace page");
        Ok(())
    }
}
