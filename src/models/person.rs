use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Someone in the user's life
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::people)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct Person {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Free-form, e.g. "friend", "sister"
    pub relationship: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub last_contacted: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Person {
    /// Creates a new person with the given name
    pub fn new(user_id: &str, name: String) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name,
            relationship: None,
            birthday: None,
            email: None,
            phone: None,
            notes: None,
            last_contacted: None,
            created_at: now,
            updated_at: now,
        }
    }
}
