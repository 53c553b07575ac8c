//! YouTube Data API video details.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::http::{FetchError, HttpClient};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Most ids the videos endpoint accepts in one call
pub const BATCH_SIZE: usize = 50;

#[derive(Debug, Error)]
pub enum YoutubeError {
    #[error("YouTube request failed: {0}")]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: Option<String>,
    pub channel_name: Option<String>,
    pub channel_id: Option<String>,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Video {
    id: String,
    #[serde(default)]
    snippet: Option<Snippet>,
    #[serde(default)]
    statistics: Option<Statistics>,
    #[serde(default)]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    channel_title: Option<String>,
    channel_id: Option<String>,
    #[serde(default)]
    thumbnails: std::collections::HashMap<String, Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

// Counts arrive as decimal strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

/// Parses an ISO-8601 duration such as `PT1H2M3S` or `P1DT30M` into seconds
pub fn parse_iso8601_duration(value: &str) -> Option<i64> {
    let rest = value.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    fn sum(part: &str, units: &[(char, i64)]) -> Option<i64> {
        let mut total = 0i64;
        let mut digits = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let (_, scale) = units.iter().find(|(unit, _)| *unit == c)?;
            let n: i64 = digits.parse().ok()?;
            total = total.checked_add(n.checked_mul(*scale)?)?;
            digits.clear();
        }
        digits.is_empty().then_some(total)
    }

    let days = sum(date_part, &[('W', 604_800), ('D', 86_400)])?;
    let time = match time_part {
        Some(t) if t.is_empty() => return None,
        Some(t) => sum(t, &[('H', 3600), ('M', 60), ('S', 1)])?,
        None => 0,
    };
    if date_part.is_empty() && time_part.is_none() {
        return None;
    }
    days.checked_add(time)
}

fn best_thumbnail(thumbnails: &std::collections::HashMap<String, Thumbnail>) -> Option<String> {
    ["maxres", "high", "medium", "standard", "default"]
        .iter()
        .find_map(|size| thumbnails.get(*size))
        .map(|t| t.url.clone())
}

impl From<Video> for VideoDetails {
    fn from(video: Video) -> Self {
        let (title, channel_name, channel_id, thumbnail_url) = match video.snippet {
            Some(s) => {
                let thumb = best_thumbnail(&s.thumbnails);
                (s.title, s.channel_title, s.channel_id, thumb)
            }
            None => (None, None, None, None),
        };
        let (view_count, like_count) = match video.statistics {
            Some(stats) => (
                stats.view_count.and_then(|v| v.parse().ok()),
                stats.like_count.and_then(|v| v.parse().ok()),
            ),
            None => (None, None),
        };
        VideoDetails {
            video_id: video.id,
            title,
            channel_name,
            channel_id,
            view_count,
            like_count,
            duration_seconds: video
                .content_details
                .and_then(|d| d.duration)
                .and_then(|d| parse_iso8601_duration(&d)),
            thumbnail_url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct YoutubeClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
}

impl YoutubeClient {
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

    /// Details for the given video ids, fetched [`BATCH_SIZE`] at a time
    ///
    /// Ids the API does not return (deleted or private videos) are absent
    /// from the result.
    #[instrument(skip(self, video_ids), fields(count = video_ids.len()))]
    pub async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoDetails>, YoutubeError> {
        let url = format!("{}/videos", self.base_url);
        let mut details = Vec::with_capacity(video_ids.len());

        for batch in video_ids.chunks(BATCH_SIZE) {
            let ids = batch.join(",");
            let response: VideosResponse = self
                .http
                .fetch_json(|c| {
                    c.get(&url).query(&[
                        ("part", "snippet,statistics,contentDetails"),
                        ("id", ids.as_str()),
                        ("key", self.api_key.as_str()),
                    ])
                })
                .await?;
            debug!(requested = batch.len(), returned = response.items.len(), "Fetched video batch");
            details.extend(response.items.into_iter().map(VideoDetails::from));
        }

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fast_http_client, spawn_mock_server};
    use axum::extract::{Query, State};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT10M"), Some(600));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401));
        assert_eq!(parse_iso8601_duration("P0D"), Some(0));
        assert_eq!(parse_iso8601_duration("PT"), None);
        assert_eq!(parse_iso8601_duration("P"), None);
        assert_eq!(parse_iso8601_duration("1H"), None);
        assert_eq!(parse_iso8601_duration("PT5X"), None);
        assert_eq!(parse_iso8601_duration("PT5"), None);
    }

    async fn videos(
        State(batches): State<Arc<Mutex<Vec<usize>>>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        let ids: Vec<String> = params["id"].split(',').map(str::to_string).collect();
        batches.lock().unwrap().push(ids.len());
        let items: Vec<Value> = ids
            .iter()
            .filter(|id| id.as_str() != "gone")
            .map(|id| {
                json!({
                    "id": id,
                    "snippet": {
                        "title": format!("Video {}", id),
                        "channelTitle": "Channel",
                        "thumbnails": {"default": {"url": "https://i.test/d.jpg"}, "high": {"url": "https://i.test/h.jpg"}}
                    },
                    "statistics": {"viewCount": "1200", "likeCount": "34"},
                    "contentDetails": {"duration": "PT4M5S"}
                })
            })
            .collect();
        Json(json!({"items": items}))
    }

    #[tokio::test]
    async fn test_video_details_batches_by_fifty() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new().route("/videos", get(videos)).with_state(batches.clone());
        let base = spawn_mock_server(router).await;
        let client = YoutubeClient::with_base_url(fast_http_client(), "key", base);

        let mut ids: Vec<String> = (0..120).map(|i| format!("v{}", i)).collect();
        ids.push("gone".to_string());

        let details = client.video_details(&ids).await.unwrap();

        assert_eq!(*batches.lock().unwrap(), vec![50, 50, 21]);
        assert_eq!(details.len(), 120);
        assert_eq!(details[0].view_count, Some(1200));
        assert_eq!(details[0].like_count, Some(34));
        assert_eq!(details[0].duration_seconds, Some(245));
        assert_eq!(details[0].thumbnail_url.as_deref(), Some("https://i.test/h.jpg"));
    }
}
