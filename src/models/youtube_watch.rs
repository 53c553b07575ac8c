use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single watch event imported from YouTube history
///
/// The same video watched twice produces two rows; `(user_id, video_id,
/// watched_at)` is unique so re-importing a Takeout archive is idempotent.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::youtube_watches)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct YoutubeWatch {
    pub id: String,
    pub user_id: String,
    pub video_id: String,
    pub title: String,
    pub channel_name: Option<String>,
    pub channel_url: Option<String>,
    pub watched_at: NaiveDateTime,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub thumbnail_url: Option<String>,
    pub created_at: NaiveDateTime,
}

impl YoutubeWatch {
    pub fn new(user_id: &str, video_id: String, title: String, watched_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            video_id,
            title,
            channel_name: None,
            channel_url: None,
            watched_at,
            view_count: None,
            like_count: None,
            duration_seconds: None,
            thumbnail_url: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    /// Whether video statistics have been fetched for this row
    pub fn has_details(&self) -> bool {
        self.view_count.is_some() || self.duration_seconds.is_some()
    }
}
