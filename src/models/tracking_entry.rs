use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One measurement of a tracked metric (sleep hours, weight, mood, ...)
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::tracking_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrackingEntry {
    pub id: String,
    pub user_id: String,
    pub metric: String,
    pub value: f64,
    pub unit: Option<String>,
    pub note: Option<String>,
    /// When the measurement was taken
    pub recorded_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl TrackingEntry {
    pub fn new(user_id: &str, metric: String, value: f64, recorded_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            metric,
            value,
            unit: None,
            note: None,
            recorded_at,
            created_at: Utc::now().naive_utc(),
        }
    }
}
