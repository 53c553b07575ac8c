//! Google Takeout `watch-history.json` parsing.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::YoutubeWatch;

const ADS_DETAIL: &str = "From Google Ads";
const WATCHED_PREFIX: &str = "Watched ";

#[derive(Debug, Error)]
pub enum TakeoutError {
    #[error("watch history is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Activity {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    title_url: Option<String>,
    #[serde(default)]
    subtitles: Vec<Subtitle>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    details: Vec<Detail>,
}

#[derive(Debug, Deserialize)]
struct Subtitle {
    name: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Detail {
    name: Option<String>,
}

/// One video watch read from the export
#[derive(Debug, Clone, PartialEq)]
pub struct TakeoutWatch {
    pub video_id: String,
    pub title: String,
    pub channel_name: Option<String>,
    pub channel_url: Option<String>,
    pub watched_at: DateTime<Utc>,
}

impl TakeoutWatch {
    pub fn into_watch(self, user_id: &str) -> YoutubeWatch {
        let mut watch = YoutubeWatch::new(user_id, self.video_id, self.title, self.watched_at.naive_utc());
        watch.channel_name = self.channel_name;
        watch.channel_url = self.channel_url;
        watch
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHistory {
    pub watches: Vec<TakeoutWatch>,
    /// Ads, removed videos and non-video activity
    pub skipped: usize,
}

/// Counts reported after an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub parsed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

fn is_video_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 32 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// The video id in a watch, short-link or shorts URL
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let id = match host {
        "youtu.be" => url.path_segments()?.next()?.to_string(),
        "youtube.com" | "music.youtube.com" => {
            let mut segments = url.path_segments()?;
            match segments.next()? {
                "watch" => url.query_pairs().find(|(k, _)| k == "v")?.1.into_owned(),
                "shorts" | "live" => segments.next()?.to_string(),
                _ => return None,
            }
        }
        _ => return None,
    };

    is_video_id(&id).then_some(id)
}

impl Activity {
    fn is_ad(&self) -> bool {
        self.details.iter().any(|d| d.name.as_deref() == Some(ADS_DETAIL))
    }

    fn into_watch(self) -> Option<TakeoutWatch> {
        if self.is_ad() {
            return None;
        }
        let video_id = extract_video_id(self.title_url.as_deref()?)?;
        let watched_at = DateTime::parse_from_rfc3339(self.time.as_deref()?).ok()?.with_timezone(&Utc);

        let raw_title = self.title.unwrap_or_default();
        let title = raw_title.strip_prefix(WATCHED_PREFIX).unwrap_or(&raw_title).trim().to_string();
        let title = if title.is_empty() { video_id.clone() } else { title };

        let channel = self.subtitles.into_iter().next();
        let (channel_name, channel_url) = match channel {
            Some(s) => (s.name, s.url),
            None => (None, None),
        };

        Some(TakeoutWatch { video_id, title, channel_name, channel_url, watched_at })
    }
}

/// Parses the export; records that are not video watches are counted as skipped
///
/// ### Errors
///
/// Fails only when the input is not a JSON array of objects.
pub fn parse_watch_history(bytes: &[u8]) -> Result<ParsedHistory, TakeoutError> {
    let activities: Vec<Activity> = serde_json::from_slice(bytes)?;
    let total = activities.len();

    let watches: Vec<TakeoutWatch> = activities.into_iter().filter_map(Activity::into_watch).collect();
    let skipped = total - watches.len();

    debug!(total, watches = watches.len(), skipped, "Parsed watch history");
    Ok(ParsedHistory { watches, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_video_id() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(extract_video_id("https://www.youtube.com/watch?feature=x&v=abc_-123").as_deref(), Some("abc_-123"));
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=10").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(extract_video_id("https://youtube.com/shorts/Short123").as_deref(), Some("Short123"));
        assert_eq!(extract_video_id("https://m.youtube.com/watch?v=mobile1").as_deref(), Some("mobile1"));
        assert_eq!(extract_video_id("https://www.youtube.com/channel/UC123"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=abc"), None);
        assert_eq!(extract_video_id("not a url"), None);
    }

    #[test]
    fn test_parse_watch_history() {
        let export = json!([
            {
                "header": "YouTube",
                "title": "Watched Rust in 100 Seconds",
                "titleUrl": "https://www.youtube.com/watch?v=5C_HPTJg5ek",
                "subtitles": [{"name": "Fireship", "url": "https://www.youtube.com/channel/UCsBjURrPoezykLs9EqgamOA"}],
                "time": "2024-03-01T18:30:00.123Z",
                "products": ["YouTube"]
            },
            {
                "header": "YouTube",
                "title": "Watched Buy our product",
                "titleUrl": "https://www.youtube.com/watch?v=adAdAdAd",
                "time": "2024-03-01T18:00:00Z",
                "details": [{"name": "From Google Ads"}]
            },
            {
                "header": "YouTube",
                "title": "Watched a video that has been removed",
                "time": "2024-02-01T10:00:00Z"
            },
            {
                "header": "YouTube",
                "title": "Visited YouTube Music",
                "titleUrl": "https://music.youtube.com/",
                "time": "2024-02-01T09:00:00Z"
            },
            {
                "header": "YouTube",
                "title": "Watched Untimed",
                "titleUrl": "https://www.youtube.com/watch?v=untimed1"
            }
        ]);

        let parsed = parse_watch_history(export.to_string().as_bytes()).unwrap();

        assert_eq!(parsed.watches.len(), 1);
        assert_eq!(parsed.skipped, 4);

        let watch = &parsed.watches[0];
        assert_eq!(watch.video_id, "5C_HPTJg5ek");
        assert_eq!(watch.title, "Rust in 100 Seconds");
        assert_eq!(watch.channel_name.as_deref(), Some("Fireship"));
        assert_eq!(watch.watched_at.to_rfc3339(), "2024-03-01T18:30:00.123+00:00");

        let row = watch.clone().into_watch("u");
        assert_eq!(row.user_id, "u");
        assert_eq!(row.channel_name.as_deref(), Some("Fireship"));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_watch_history(b"{\"title\": \"x\"}").is_err());
        assert!(parse_watch_history(b"not json").is_err());
        assert_eq!(parse_watch_history(b"[]").unwrap().skipped, 0);
    }
}
