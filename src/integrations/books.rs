//! Google Books volume lookups.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::http::{FetchError, HttpClient};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";

const SEARCH_RESULTS: &str = "5";

#[derive(Debug, Error)]
pub enum BooksError {
    #[error("a book lookup needs an ISBN or a title")]
    MissingQuery,

    #[error("Google Books request failed: {0}")]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: Option<String>,
    authors: Vec<String>,
    description: Option<String>,
    published_date: Option<String>,
    page_count: Option<u32>,
    categories: Vec<String>,
    image_links: Option<ImageLinks>,
    industry_identifiers: Vec<IndustryIdentifier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

/// Book metadata mapped onto local fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDetails {
    pub google_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub page_count: Option<u32>,
    pub categories: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub isbn13: Option<String>,
}

impl BookDetails {
    /// Authors joined for the `creator` column
    pub fn creator(&self) -> Option<String> {
        (!self.authors.is_empty()).then(|| self.authors.join(", "))
    }
}

/// Removes HTML tags and decodes the handful of entities Google Books emits
pub fn strip_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    let decoded = out
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn https(url: String) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url,
    }
}

impl Volume {
    fn into_details(self) -> Option<BookDetails> {
        let info = self.volume_info;
        let isbn13 = info
            .industry_identifiers
            .into_iter()
            .find(|id| id.kind == "ISBN_13")
            .map(|id| id.identifier);
        let thumbnail_url = info
            .image_links
            .and_then(|links| links.thumbnail.or(links.small_thumbnail))
            .map(https);

        Some(BookDetails {
            google_id: self.id,
            title: info.title.filter(|t| !t.trim().is_empty())?,
            authors: info.authors,
            description: info.description.map(|d| strip_html(&d)).filter(|d| !d.is_empty()),
            year: info
                .published_date
                .and_then(|d| d.get(..4).and_then(|y| y.parse().ok())),
            page_count: info.page_count.filter(|&n| n > 0),
            categories: info.categories,
            thumbnail_url,
            isbn13,
        })
    }
}

/// Digits of an ISBN with separators removed (a trailing `X` is kept)
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[derive(Debug, Clone)]
pub struct BooksClient {
    http: HttpClient,
    api_key: Option<String>,
    base_url: String,
}

impl BooksClient {
    pub fn new(http: HttpClient, api_key: Option<String>) -> Self {
        Self::with_base_url(http, api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: HttpClient, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn volumes(&self, query: &str, max_results: &str) -> Result<Vec<BookDetails>, BooksError> {
        let url = format!("{}/volumes", self.base_url);
        let response: VolumesResponse = self
            .http
            .fetch_json(|c| {
                let request = c.get(&url).query(&[("q", query), ("maxResults", max_results)]);
                match &self.api_key {
                    Some(key) => request.query(&[("key", key.as_str())]),
                    None => request,
                }
            })
            .await?;

        let books: Vec<BookDetails> = response.items.into_iter().filter_map(Volume::into_details).collect();
        debug!(count = books.len(), "Google Books results");
        Ok(books)
    }

    /// The volume with the given ISBN, if Google Books knows it
    #[instrument(skip(self))]
    pub async fn by_isbn(&self, isbn: &str) -> Result<Option<BookDetails>, BooksError> {
        let isbn = normalize_isbn(isbn);
        if isbn.is_empty() {
            return Err(BooksError::MissingQuery);
        }
        let books = self.volumes(&format!("isbn:{}", isbn), "1").await?;
        Ok(books.into_iter().next())
    }

    /// Volumes matching a title and optionally an author, best match first
    #[instrument(skip(self))]
    pub async fn search(&self, title: &str, author: Option<&str>) -> Result<Vec<BookDetails>, BooksError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BooksError::MissingQuery);
        }
        let mut query = format!("intitle:{}", title);
        if let Some(author) = author.map(str::trim).filter(|a| !a.is_empty()) {
            query.push_str(&format!(" inauthor:{}", author));
        }
        self.volumes(&query, SEARCH_RESULTS).await
    }

    /// ISBN first, then title and author
    pub async fn find(&self, isbn: Option<&str>, title: &str, author: Option<&str>) -> Result<Option<BookDetails>, BooksError> {
        if let Some(isbn) = isbn.filter(|i| !normalize_isbn(i).is_empty()) {
            if let Some(book) = self.by_isbn(isbn).await? {
                return Ok(Some(book));
            }
        }
        Ok(self.search(title, author).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fast_http_client, spawn_mock_server};
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn dune() -> Value {
        json!({
            "id": "vol-1",
            "volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert"],
                "description": "<p>Set on the desert planet <b>Arrakis</b>, &quot;Dune&quot; is&nbsp;epic.</p>",
                "publishedDate": "1965-08-01",
                "pageCount": 412,
                "categories": ["Fiction"],
                "imageLinks": {"thumbnail": "http://books.test/dune.jpg"},
                "industryIdentifiers": [
                    {"type": "ISBN_10", "identifier": "0441013597"},
                    {"type": "ISBN_13", "identifier": "9780441013593"}
                ]
            }
        })
    }

    async fn volumes(
        State(hits): State<Arc<AtomicUsize>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        // The first request of every test is rate limited
        if hits.fetch_add(1, Ordering::SeqCst) == 0 {
            return (StatusCode::TOO_MANY_REQUESTS, Json(json!({"error": "slow down"})));
        }
        let q = params.get("q").cloned().unwrap_or_default();
        let body = if q == "isbn:9780441013593" || q.starts_with("intitle:Dune") {
            json!({"totalItems": 1, "items": [dune()]})
        } else {
            json!({"totalItems": 0})
        };
        (StatusCode::OK, Json(body))
    }

    async fn client() -> (BooksClient, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new().route("/volumes", get(volumes)).with_state(hits.clone());
        let base = spawn_mock_server(router).await;
        (BooksClient::with_base_url(fast_http_client(), None, base), hits)
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>One<br/>two &amp; three</p>"), "One two & three");
        assert_eq!(strip_html("plain"), "plain");
    }

    #[test]
    fn test_normalize_isbn() {
        assert_eq!(normalize_isbn("978-0-441-01359-3"), "9780441013593");
        assert_eq!(normalize_isbn("0-8044-2957-x"), "080442957X");
    }

    #[tokio::test]
    async fn test_by_isbn_retries_and_maps() {
        let (client, hits) = client().await;

        let book = client.by_isbn("978-0441013593").await.unwrap().unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(book.title, "Dune");
        assert_eq!(book.creator().as_deref(), Some("Frank Herbert"));
        assert_eq!(book.description.as_deref(), Some("Set on the desert planet Arrakis , \"Dune\" is epic."));
        assert_eq!(book.year, Some(1965));
        assert_eq!(book.thumbnail_url.as_deref(), Some("https://books.test/dune.jpg"));
        assert_eq!(book.isbn13.as_deref(), Some("9780441013593"));
    }

    #[tokio::test]
    async fn test_find_falls_back_to_title() {
        let (client, _) = client().await;

        let book = client.find(Some("0000000000"), "Dune", Some("Herbert")).await.unwrap();
        assert_eq!(book.map(|b| b.google_id), Some("vol-1".to_string()));

        let none = client.find(None, "Unknown", None).await.unwrap();
        assert_eq!(none, None);
    }

    #[tokio::test]
    async fn test_search_requires_title() {
        let (client, hits) = client().await;
        assert!(matches!(client.search("  ", None).await, Err(BooksError::MissingQuery)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
