use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored Spotify OAuth tokens for a user
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::spotify_tokens)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SpotifyToken {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: NaiveDateTime,
    pub scope: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl SpotifyToken {
    /// Whether the access token expires within `margin` of `now`
    pub fn expires_within(&self, now: NaiveDateTime, margin: Duration) -> bool {
        self.expires_at <= now + margin
    }
}
