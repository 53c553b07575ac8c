use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MediaStatus, MediaType, StringList};

/// A movie, series, book or other piece of media the user tracks
///
/// Maps to the `media` table. `notion_page_id` links the row to its mirror
/// page in the workspace when one exists.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::media)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct Media {
    /// Unique identifier (UUID v4 as string)
    pub id: String,
    /// Owner of the row
    pub user_id: String,
    pub title: String,
    pub media_type: MediaType,
    pub status: MediaStatus,
    /// Personal rating, 1 to 10
    pub rating: Option<i32>,
    pub imdb_id: Option<String>,
    pub goodreads_id: Option<String>,
    pub isbn: Option<String>,
    /// Director, author or artist
    pub creator: Option<String>,
    pub year: Option<i32>,
    pub genres: StringList,
    /// Synopsis, filled by enrichment when missing
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub url: Option<String>,
    pub notion_page_id: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Media {
    /// Creates a new media row with only the required fields set
    ///
    /// ### Arguments
    ///
    /// * `user_id` - The owner of the row
    /// * `title` - The title of the media
    /// * `media_type` - What kind of media it is
    /// * `status` - The initial status
    pub fn new(user_id: &str, title: String, media_type: MediaType, status: MediaStatus) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            media_type,
            status,
            rating: None,
            imdb_id: None,
            goodreads_id: None,
            isbn: None,
            creator: None,
            year: None,
            genres: StringList::default(),
            description: None,
            poster_url: None,
            url: None,
            notion_page_id: None,
            started_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the row still needs a synopsis
    pub fn needs_description(&self) -> bool {
        self.description.as_deref().is_none_or(|d| d.trim().is_empty())
    }
}
