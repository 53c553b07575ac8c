use std::sync::Arc;

use axum::extract::FromRef;
use tracing::info;

use crate::config::Config;
use crate::db::DbPool;
use crate::errors::ApiError;
use crate::http::{HttpClient, RetryPolicy};
use crate::integrations::{AiClient, BooksClient, OmdbClient, SpotifyClient, YoutubeClient};
use crate::workspace::{PropertyMapping, WorkspaceClient};

/// Clients for every external service, built once at startup
///
/// An integration without credentials is `None`; routes that need it answer
/// 503. Google Books works without a key and is always present.
#[derive(Debug, Clone)]
pub struct Services {
    pub http: HttpClient,
    pub workspace: Option<WorkspaceClient>,
    pub omdb: Option<OmdbClient>,
    pub books: BooksClient,
    pub youtube: Option<YoutubeClient>,
    pub spotify: Option<SpotifyClient>,
    pub ai: Option<AiClient>,
}

impl Services {
    /// Builds the service bundle from the final configuration
    ///
    /// ### Errors
    ///
    /// Returns an error if the shared HTTP client cannot be built.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let policy = RetryPolicy::with_max_retries(config.max_retries);
        let http = HttpClient::new(policy, config.request_timeout())?;

        let workspace = config.notion_token.clone().map(|token| WorkspaceClient::new(http.clone(), token));
        let omdb = config.omdb_api_key.clone().map(|key| OmdbClient::new(http.clone(), key));
        let books = BooksClient::new(http.clone(), config.google_books_api_key.clone());
        let youtube = config.youtube_api_key.clone().map(|key| YoutubeClient::new(http.clone(), key));
        let spotify = match (&config.spotify_client_id, &config.spotify_client_secret, &config.spotify_redirect_uri) {
            (Some(id), Some(secret), Some(redirect)) => {
                Some(SpotifyClient::new(http.clone(), id.clone(), secret.clone(), redirect.clone()))
            }
            _ => None,
        };
        let ai = config
            .ai_gateway_url
            .clone()
            .map(|url| AiClient::new(http.clone(), url, config.ai_gateway_key.clone(), config.ai_model.clone()));

        info!("Enabled integrations: {}", config.enabled_integrations().join(", "));

        Ok(Self { http, workspace, omdb, books, youtube, spotify, ai })
    }

    pub fn omdb(&self) -> Result<&OmdbClient, ApiError> {
        self.omdb.as_ref().ok_or_else(|| ApiError::NotConfigured("OMDb".to_string()))
    }

    pub fn youtube(&self) -> Result<&YoutubeClient, ApiError> {
        self.youtube.as_ref().ok_or_else(|| ApiError::NotConfigured("YouTube".to_string()))
    }

    pub fn spotify(&self) -> Result<&SpotifyClient, ApiError> {
        self.spotify.as_ref().ok_or_else(|| ApiError::NotConfigured("Spotify".to_string()))
    }

    pub fn workspace(&self) -> Result<&WorkspaceClient, ApiError> {
        self.workspace.as_ref().ok_or_else(|| ApiError::NotConfigured("Notion".to_string()))
    }
}

/// Shared application state available to all handlers via `State<AppState>`
///
/// Cheap to clone; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub config: Arc<Config>,
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(pool: Arc<DbPool>, config: Config, services: Services) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }

    pub fn mapping(&self) -> &PropertyMapping {
        &self.config.properties
    }
}

impl FromRef<AppState> for Arc<DbPool> {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<Services> {
    fn from_ref(state: &AppState) -> Self {
        state.services.clone()
    }
}
