use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A pending OAuth authorization, keyed by the random `state` parameter
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::oauth_states)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OauthState {
    pub state: String,
    pub user_id: String,
    pub created_at: NaiveDateTime,
}
