use axum::extract::State;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::dto::{CreateTrackingDto, TrackingQuery};
use crate::errors::ApiError;
use crate::extract::{Json, Path, Query};
use crate::models::TrackingEntry;
use crate::repo;
use crate::views::{self, TrackingSummary};

fn load_entries(pool: &DbPool, user_id: &str, query: &TrackingQuery) -> Result<Vec<TrackingEntry>, ApiError> {
    let now = Utc::now().naive_utc();
    let metric = query.metric.as_deref().map(|m| m.trim().to_lowercase()).filter(|m| !m.is_empty());

    let entries = repo::list_entries(pool, user_id, metric.as_deref(), query.range.start(now))
        .map_err(ApiError::Database)?;

    // `start` is only a lower bound; `contains` also applies the calendar-day rule
    Ok(entries.into_iter().filter(|e| query.range.contains(e.recorded_at, now)).collect())
}

/// Handler for listing tracking entries, newest first
///
/// This function handles GET requests to `/tracking`.
///
/// ### Arguments
///
/// * `pool` - The database connection pool
/// * `user` - The authenticated user
/// * `query` - Optional metric name and date range
#[instrument(skip(pool, user))]
pub async fn list_tracking_handler(
    State(pool): State<Arc<DbPool>>,
    user: AuthUser,
    Query(query): Query<TrackingQuery>,
) -> Result<Json<Vec<TrackingEntry>>, ApiError> {
    let entries = load_entries(&pool, &user.user_id, &query)?;
    debug!("Retrieved {} tracking entries", entries.len());
    Ok(Json(entries))
}

/// Handler for recording a value
///
/// This function handles POST requests to `/tracking`. Metric names are
/// stored lowercase; `recorded_at` defaults to now.
#[instrument(skip(pool, user, payload), fields(metric = %payload.metric))]
pub async fn create_tracking_handler(
    State(pool): State<Arc<DbPool>>,
    user: AuthUser,
    Json(payload): Json<CreateTrackingDto>,
) -> Result<Json<TrackingEntry>, ApiError> {
    let entry = payload
        .into_entry(&user.user_id, Utc::now().naive_utc())
        .map_err(ApiError::BadRequest)?;
    let entry = repo::create_entry(&pool, entry).await.map_err(ApiError::Database)?;

    info!("Recorded tracking entry with id: {}", entry.id);
    Ok(Json(entry))
}

/// Handler for deleting a tracking entry
///
/// This function handles DELETE requests to `/tracking/{id}`.
#[instrument(skip(pool, user))]
pub async fn delete_tracking_handler(
    State(pool): State<Arc<DbPool>>,
    user: AuthUser,
    Path(entry_id): Path<String>,
) -> Result<Json<()>, ApiError> {
    let deleted = repo::delete_entry(&pool, &user.user_id, &entry_id)
        .await
        .map_err(ApiError::Database)?;

    if !deleted {
        return Err(ApiError::NotFound);
    }
    Ok(Json(()))
}

/// Handler summarising each metric over the range
///
/// This function handles GET requests to `/tracking/summary`.
#[instrument(skip(pool, user))]
pub async fn tracking_summary_handler(
    State(pool): State<Arc<DbPool>>,
    user: AuthUser,
    Query(query): Query<TrackingQuery>,
) -> Result<Json<Vec<TrackingSummary>>, ApiError> {
    let entries = load_entries(&pool, &user.user_id, &query)?;
    Ok(Json(views::summarize_tracking(&entries)))
}
