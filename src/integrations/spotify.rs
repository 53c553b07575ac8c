//! Spotify authorization-code flow and playback reads.

use chrono::{DateTime, Duration, NaiveDateTime};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::http::{decode_json, FetchError, HttpClient};
use crate::models::SpotifyToken;

pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

pub const SCOPES: &str = "user-read-currently-playing user-read-playback-state user-read-recently-played";

/// Tokens expiring sooner than this are refreshed before use
pub const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Spotify request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not build Spotify request: {0}")]
    Request(#[from] reqwest::Error),
}

/// Response of the token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenGrant {
    /// The row to store; a refresh grant without a new refresh token keeps the old one
    pub fn into_token(self, user_id: &str, now: NaiveDateTime, previous_refresh: Option<String>) -> Option<SpotifyToken> {
        let refresh_token = self.refresh_token.or(previous_refresh)?;
        Some(SpotifyToken {
            user_id: user_id.to_string(),
            access_token: self.access_token,
            refresh_token,
            expires_at: now + Duration::seconds(self.expires_in),
            scope: self.scope,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub image_url: Option<String>,
    pub url: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub is_playing: bool,
    pub progress_ms: Option<u64>,
    pub track: Track,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentPlay {
    pub played_at: DateTime<chrono::Utc>,
    pub track: Track,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    name: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<ApiNamed>,
    album: Option<ApiAlbum>,
    #[serde(default)]
    external_urls: Option<ApiUrls>,
}

#[derive(Debug, Deserialize)]
struct ApiNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    name: String,
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    #[serde(default)]
    is_playing: bool,
    progress_ms: Option<u64>,
    item: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct RecentlyPlayed {
    items: Vec<PlayHistory>,
}

#[derive(Debug, Deserialize)]
struct PlayHistory {
    track: ApiTrack,
    played_at: DateTime<chrono::Utc>,
}

impl From<ApiTrack> for Track {
    fn from(track: ApiTrack) -> Self {
        let (album, image_url) = match track.album {
            Some(album) => {
                let image = album.images.into_iter().next().map(|i| i.url);
                (Some(album.name), image)
            }
            None => (None, None),
        };
        Track {
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album,
            image_url,
            url: track.external_urls.and_then(|u| u.spotify),
            duration_ms: track.duration_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: HttpClient,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    accounts_url: String,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(http: HttpClient, client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http,
            client_id,
            client_secret,
            redirect_uri,
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Points both the accounts and API endpoints at other hosts
    pub fn with_base_urls(mut self, accounts_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.accounts_url = accounts_url.into().trim_end_matches('/').to_string();
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The URL the user visits to grant access
    pub fn authorize_url(&self, state: &str) -> Result<String, SpotifyError> {
        let request = self
            .http
            .client()
            .get(format!("{}/authorize", self.accounts_url))
            .query(&[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("scope", SCOPES),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
            ])
            .build()?;
        Ok(request.url().to_string())
    }

    /// Trades an authorization code for tokens, in a single attempt
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, SpotifyError> {
        let url = format!("{}/api/token", self.accounts_url);
        let response = self
            .http
            .send_once(|c| {
                c.post(&url)
                    .basic_auth(&self.client_id, Some(&self.client_secret))
                    .form(&[
                        ("grant_type", "authorization_code"),
                        ("code", code),
                        ("redirect_uri", self.redirect_uri.as_str()),
                    ])
            })
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body }.into());
        }
        info!("Exchanged Spotify authorization code");
        Ok(decode_json(response).await?)
    }

    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, SpotifyError> {
        let url = format!("{}/api/token", self.accounts_url);
        let grant = self
            .http
            .fetch_json(|c| {
                c.post(&url)
                    .basic_auth(&self.client_id, Some(&self.client_secret))
                    .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            })
            .await?;
        debug!("Refreshed Spotify access token");
        Ok(grant)
    }

    /// The track playing now; `None` when nothing is playing
    #[instrument(skip_all)]
    pub async fn currently_playing(&self, access_token: &str) -> Result<Option<NowPlaying>, SpotifyError> {
        let url = format!("{}/me/player/currently-playing", self.api_url);
        let response = self.http.send(|c| c.get(&url).bearer_auth(access_token)).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let current: CurrentlyPlaying = decode_json(response).await?;
        Ok(current.item.map(|item| NowPlaying {
            is_playing: current.is_playing,
            progress_ms: current.progress_ms,
            track: item.into(),
        }))
    }

    #[instrument(skip(self, access_token))]
    pub async fn recently_played(&self, access_token: &str, limit: u32) -> Result<Vec<RecentPlay>, SpotifyError> {
        let url = format!("{}/me/player/recently-played", self.api_url);
        let limit = limit.clamp(1, 50).to_string();
        let recent: RecentlyPlayed = self
            .http
            .fetch_json(|c| c.get(&url).bearer_auth(access_token).query(&[("limit", limit.as_str())]))
            .await?;
        Ok(recent
            .items
            .into_iter()
            .map(|play| RecentPlay { played_at: play.played_at, track: play.track.into() })
            .collect())
    }
}
