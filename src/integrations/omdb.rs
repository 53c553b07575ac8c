//! OMDb lookups by IMDb id.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::http::{FetchError, HttpClient};
use crate::models::MediaType;

pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com";

#[derive(Debug, Error)]
pub enum OmdbError {
    #[error("invalid IMDb id: {0}")]
    InvalidId(String),

    #[error("no OMDb entry for {0}")]
    NotFound(String),

    #[error("OMDb request failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Raw OMDb response; every field is a string, `"N/A"` when unknown
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbResponse {
    response: String,
    error: Option<String>,
    title: Option<String>,
    year: Option<String>,
    plot: Option<String>,
    poster: Option<String>,
    genre: Option<String>,
    director: Option<String>,
    writer: Option<String>,
    runtime: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
}

/// Film or series metadata mapped onto local fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub imdb_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub plot: Option<String>,
    pub poster_url: Option<String>,
    pub genres: Vec<String>,
    pub creator: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub imdb_rating: Option<f32>,
    pub media_type: MediaType,
}

/// `tt` followed by 7 to 9 digits
pub fn is_valid_imdb_id(id: &str) -> bool {
    id.strip_prefix("tt")
        .is_some_and(|digits| (7..=9).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn known(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "N/A")
}

fn leading_number<T: std::str::FromStr>(value: &str) -> Option<T> {
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

impl OmdbResponse {
    fn into_details(self, imdb_id: &str) -> Option<MovieDetails> {
        let media_type = match known(self.kind).as_deref() {
            Some("series") | Some("episode") => MediaType::Series,
            _ => MediaType::Movie,
        };
        let director = known(self.director);
        let writer = known(self.writer);
        let creator = match media_type {
            MediaType::Series => writer.or(director),
            _ => director.or(writer),
        };

        Some(MovieDetails {
            imdb_id: imdb_id.to_string(),
            title: known(self.title)?,
            year: known(self.year).and_then(|y| leading_number(&y)),
            plot: known(self.plot),
            poster_url: known(self.poster),
            genres: known(self.genre)
                .map(|g| g.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or_default(),
            creator,
            runtime_minutes: known(self.runtime).and_then(|r| leading_number(&r)),
            imdb_rating: known(self.imdb_rating).and_then(|r| r.parse().ok()),
            media_type,
        })
    }
}

#[derive(Debug, Clone)]
pub struct OmdbClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
}

impl OmdbClient {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http, api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: HttpClient, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Looks up a title by IMDb id
    ///
    /// ### Errors
    ///
    /// * `OmdbError::InvalidId` before any request when the id is malformed
    /// * `OmdbError::NotFound` when OMDb answers `Response: "False"`
    #[instrument(skip(self))]
    pub async fn lookup(&self, imdb_id: &str) -> Result<MovieDetails, OmdbError> {
        let imdb_id = imdb_id.trim();
        if !is_valid_imdb_id(imdb_id) {
            return Err(OmdbError::InvalidId(imdb_id.to_string()));
        }

        let url = format!("{}/", self.base_url);
        let response: OmdbResponse = self
            .http
            .fetch_json(|c| {
                c.get(&url)
                    .query(&[("i", imdb_id), ("plot", "full"), ("apikey", self.api_key.as_str())])
            })
            .await?;

        if response.response != "True" {
            debug!(error = ?response.error, "OMDb returned no result");
            return Err(OmdbError::NotFound(imdb_id.to_string()));
        }
        response
            .into_details(imdb_id)
            .ok_or_else(|| OmdbError::NotFound(imdb_id.to_string()))
    }
}
