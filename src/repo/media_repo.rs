use crate::db::{DbPool, ExecuteWithRetry};
use crate::models::Media;
use crate::schema::media;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Inserts a media row
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `new_media` - The row to insert, already carrying its id and owner
///
/// ### Returns
///
/// A Result containing the inserted Media
///
/// ### Errors
///
/// Returns an error if:
/// - Unable to get a connection from the pool
/// - The database insert operation fails
#[instrument(skip(pool, new_media), fields(media_id = %new_media.id, title = %new_media.title))]
pub async fn create_media(pool: &DbPool, new_media: Media) -> Result<Media> {
    debug!("Creating media");

    let mut conn = pool.get()?;

    diesel::insert_into(media::table)
        .values(new_media.clone())
        .execute_with_retry(&mut conn).await?;

    info!("Created media with id: {}", new_media.id);
    Ok(new_media)
}

/// Retrieves a media row owned by `user_id`
///
/// ### Returns
///
/// A Result containing Some(Media) if found, or None if there is no such row
/// or it belongs to someone else
#[instrument(skip(pool))]
pub fn get_media(pool: &DbPool, user_id: &str, media_id: &str) -> Result<Option<Media>> {
    debug!("Retrieving media by id");

    let conn = &mut pool.get()?;

    let result = media::table
        .filter(media::id.eq(media_id))
        .filter(media::user_id.eq(user_id))
        .select(Media::as_select())
        .first(conn)
        .optional()?;

    Ok(result)
}

/// Lists every media row of a user, most recently updated first
#[instrument(skip(pool))]
pub fn list_media(pool: &DbPool, user_id: &str) -> Result<Vec<Media>> {
    let conn = &mut pool.get()?;

    let result = media::table
        .filter(media::user_id.eq(user_id))
        .order(media::updated_at.desc())
        .select(Media::as_select())
        .load(conn)?;

    debug!("Retrieved {} media rows", result.len());
    Ok(result)
}

/// Lists up to `limit` rows of a user that have no description yet
///
/// Rows never looked up come first, then those whose last lookup is oldest.
#[instrument(skip(pool))]
pub fn list_media_missing_description(pool: &DbPool, user_id: &str, limit: i64) -> Result<Vec<Media>> {
    let conn = &mut pool.get()?;

    // NULL sorts first in SQLite
    let result = media::table
        .filter(media::user_id.eq(user_id))
        .filter(media::description.is_null().or(media::description.eq("")))
        .order((media::description_checked_at.asc(), media::created_at.asc()))
        .limit(limit)
        .select(Media::as_select())
        .load(conn)?;

    debug!("Found {} media rows without a description", result.len());
    Ok(result)
}

/// Records that a description lookup ran for a row
#[instrument(skip(pool))]
pub async fn mark_description_checked(pool: &DbPool, user_id: &str, media_id: &str, at: NaiveDateTime) -> Result<()> {
    let mut conn = pool.get()?;

    diesel::update(
        media::table
            .filter(media::id.eq(media_id.to_string()))
            .filter(media::user_id.eq(user_id.to_string())),
    )
    .set(media::description_checked_at.eq(Some(at)))
    .execute_with_retry(&mut conn).await?;

    Ok(())
}

/// Writes every column of `updated` back to its row and bumps `updated_at`
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `updated` - The full row; its `id` and `user_id` select the row to change
///
/// ### Returns
///
/// A Result containing the saved row, or None if the row does not exist
/// for that user
///
/// ### Errors
///
/// Returns an error if the database update fails
#[instrument(skip(pool, updated), fields(media_id = %updated.id))]
pub async fn save_media(pool: &DbPool, mut updated: Media) -> Result<Option<Media>> {
    debug!("Saving media");

    updated.updated_at = Utc::now().naive_utc();

    let mut conn = pool.get()?;

    let rows = diesel::update(
        media::table
            .filter(media::id.eq(updated.id.clone()))
            .filter(media::user_id.eq(updated.user_id.clone())),
    )
    .set(&updated)
    .execute_with_retry(&mut conn).await?;

    if rows == 0 {
        debug!("Media not found");
        return Ok(None);
    }

    info!("Saved media with id: {}", updated.id);
    Ok(Some(updated))
}

/// Deletes a media row owned by `user_id`
///
/// ### Returns
///
/// A Result containing true if a row was deleted
#[instrument(skip(pool))]
pub async fn delete_media(pool: &DbPool, user_id: &str, media_id: &str) -> Result<bool> {
    debug!("Deleting media by id");

    let mut conn = pool.get()?;

    let rows = diesel::delete(
        media::table
            .filter(media::id.eq(media_id.to_string()))
            .filter(media::user_id.eq(user_id.to_string())),
    )
    .execute_with_retry(&mut conn).await?;

    if rows > 0 {
        info!("Deleted media with id: {}", media_id);
    }
    Ok(rows > 0)
}
