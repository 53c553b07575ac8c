use lifedash::dto::{CreateMediaDto, CreateTodoDto, CreateTrackingDto};
use lifedash::enrich::DescriptionOutcome;
use lifedash::models::{Media, Todo, TrackingEntry};
use lifedash::sync::SyncReport;
use lifedash::takeout::ImportReport;
use lifedash::views::TrackingSummary;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A failed call to the lifedash API
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error status; `message` is its `error` field
    #[error("Server error ({}): {message}", status.as_u16())]
    Server { status: reqwest::StatusCode, message: String },
    /// The request never got an answer
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

impl ClientError {
    /// Whether the server could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Request(e) if e.is_connect() || e.is_timeout())
    }
}

/// Extension trait for checking HTTP responses and extracting server error messages
trait ResponseExt {
    /// Checks for error status and extracts the server's error message body
    async fn check(self) -> Result<reqwest::Response, ClientError>;
}

impl ResponseExt for reqwest::Response {
    async fn check(self) -> Result<reqwest::Response, ClientError> {
        if self.status().is_success() {
            return Ok(self);
        }
        let status = self.status();
        let message = match self.json::<serde_json::Value>().await {
            Ok(body) => body.get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("Unknown error")
                .to_string(),
            Err(_) => format!("HTTP {}", status),
        };
        Err(ClientError::Server { status, message })
    }
}

/// Filters for `media list`, sent as repeated query keys
#[derive(Debug, Default)]
pub struct MediaFilter {
    pub q: Option<String>,
    pub status: Vec<String>,
    pub media_type: Vec<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl MediaFilter {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref q) = self.q {
            params.push(("q", q.clone()));
        }
        for status in &self.status {
            params.push(("status", status.clone()));
        }
        for media_type in &self.media_type {
            params.push(("media_type", media_type.clone()));
        }
        if let Some(ref sort) = self.sort {
            params.push(("sort", sort.clone()));
        }
        if let Some(ref order) = self.order {
            params.push(("order", order.clone()));
        }
        params
    }
}

/// HTTP client wrapper for communicating with the lifedash server
pub struct LifedashClient {
    /// The base URL of the server (e.g. "http://localhost:3000")
    base_url: String,
    /// Bearer token sent with every request
    token: Option<String>,
    client: Client,
}

impl LifedashClient {
    /// Creates a new LifedashClient
    ///
    /// ### Arguments
    ///
    /// * `base_url` - The base URL of the lifedash server
    /// * `token` - The API token, if the server requires one
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await.map_err(ClientError::Request)?.check().await?;
        response.json().await.map_err(ClientError::Request)
    }

    // ── Media endpoints ──────────────────────────────────────────────

    /// Lists media rows matching the filter
    pub async fn list_media(&self, filter: &MediaFilter) -> Result<Vec<Media>, ClientError> {
        Self::send(self.request(reqwest::Method::GET, "/media").query(&filter.params())).await
    }

    /// Creates a media row
    pub async fn create_media(&self, dto: &CreateMediaDto) -> Result<Media, ClientError> {
        Self::send(self.request(reqwest::Method::POST, "/media").json(dto)).await
    }

    /// Fills the description of one media row
    pub async fn fill_description(&self, id: &str, force: bool) -> Result<DescriptionOutcome, ClientError> {
        let path = format!("/media/{}/fill-description", id);
        Self::send(self.request(reqwest::Method::POST, &path).query(&[("force", force)])).await
    }

    // ── Todo endpoints ───────────────────────────────────────────────

    pub async fn list_todos(&self) -> Result<Vec<Todo>, ClientError> {
        Self::send(self.request(reqwest::Method::GET, "/todos")).await
    }

    pub async fn create_todo(&self, dto: &CreateTodoDto) -> Result<Todo, ClientError> {
        Self::send(self.request(reqwest::Method::POST, "/todos").json(dto)).await
    }

    /// Flips a todo between open and done
    pub async fn toggle_todo(&self, id: &str) -> Result<Todo, ClientError> {
        let path = format!("/todos/{}/toggle", id);
        Self::send(self.request(reqwest::Method::POST, &path)).await
    }

    /// Pulls todos from the workspace
    pub async fn sync_todos(&self) -> Result<SyncReport, ClientError> {
        Self::send(self.request(reqwest::Method::POST, "/todos/sync")).await
    }

    // ── Tracking endpoints ───────────────────────────────────────────

    pub async fn create_tracking(&self, dto: &CreateTrackingDto) -> Result<TrackingEntry, ClientError> {
        Self::send(self.request(reqwest::Method::POST, "/tracking").json(dto)).await
    }

    pub async fn list_tracking(&self, metric: Option<&str>, range: &str) -> Result<Vec<TrackingEntry>, ClientError> {
        let builder = self.request(reqwest::Method::GET, "/tracking").query(&tracking_params(metric, range));
        Self::send(builder).await
    }

    pub async fn tracking_summary(&self, metric: Option<&str>, range: &str) -> Result<Vec<TrackingSummary>, ClientError> {
        let builder = self.request(reqwest::Method::GET, "/tracking/summary").query(&tracking_params(metric, range));
        Self::send(builder).await
    }

    // ── YouTube endpoints ────────────────────────────────────────────

    /// Uploads a Takeout watch-history export
    pub async fn import_youtube(&self, body: Vec<u8>) -> Result<ImportReport, ClientError> {
        let builder = self
            .request(reqwest::Method::POST, "/youtube/import")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        Self::send(builder).await
    }
}

fn tracking_params(metric: Option<&str>, range: &str) -> Vec<(&'static str, String)> {
    let mut params = vec![("range", range.to_string())];
    if let Some(metric) = metric {
        params.push(("metric", metric.to_string()));
    }
    params
}
