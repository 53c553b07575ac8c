use crate::db::{DbPool, ExecuteWithRetry};
use crate::models::TrackingEntry;
use crate::schema::tracking_entries;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Records a tracking measurement
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `entry` - The measurement to store
///
/// ### Returns
///
/// A Result containing the stored TrackingEntry
#[instrument(skip(pool, entry), fields(metric = %entry.metric))]
pub async fn create_entry(pool: &DbPool, entry: TrackingEntry) -> Result<TrackingEntry> {
    debug!("Creating tracking entry");

    let mut conn = pool.get()?;

    diesel::insert_into(tracking_entries::table)
        .values(entry.clone())
        .execute_with_retry(&mut conn).await?;

    info!("Created tracking entry with id: {}", entry.id);
    Ok(entry)
}

/// Lists tracking entries of a user, newest measurement first
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `user_id` - The owner of the entries
/// * `metric` - Only return entries of this metric when set
/// * `since` - Only return entries recorded at or after this time when set
///
/// ### Returns
///
/// A Result containing the matching entries
#[instrument(skip(pool))]
pub fn list_entries(
    pool: &DbPool,
    user_id: &str,
    metric: Option<&str>,
    since: Option<NaiveDateTime>,
) -> Result<Vec<TrackingEntry>> {
    let conn = &mut pool.get()?;

    let mut query = tracking_entries::table
        .filter(tracking_entries::user_id.eq(user_id))
        .into_boxed();

    if let Some(metric) = metric {
        query = query.filter(tracking_entries::metric.eq(metric));
    }
    if let Some(since) = since {
        query = query.filter(tracking_entries::recorded_at.ge(since));
    }

    let result = query
        .order(tracking_entries::recorded_at.desc())
        .select(TrackingEntry::as_select())
        .load(conn)?;

    debug!("Retrieved {} tracking entries", result.len());
    Ok(result)
}

/// Deletes a tracking entry owned by `user_id`
#[instrument(skip(pool))]
pub async fn delete_entry(pool: &DbPool, user_id: &str, entry_id: &str) -> Result<bool> {
    let mut conn = pool.get()?;

    let rows = diesel::delete(
        tracking_entries::table
            .filter(tracking_entries::id.eq(entry_id.to_string()))
            .filter(tracking_entries::user_id.eq(user_id.to_string())),
    )
    .execute_with_retry(&mut conn).await?;

    if rows > 0 {
        info!("Deleted tracking entry with id: {}", entry_id);
    }
    Ok(rows > 0)
}
