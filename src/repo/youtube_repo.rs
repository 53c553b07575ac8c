use crate::db::{execute_with_retry, DbPool, ExecuteWithRetry};
use crate::integrations::VideoDetails;
use crate::models::YoutubeWatch;
use crate::schema::youtube_watches;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Inserts watch events, skipping any already stored
///
/// All rows are written in one transaction; a row whose `(user_id, video_id,
/// watched_at)` already exists is ignored.
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `watches` - The rows to insert
///
/// ### Returns
///
/// A Result containing the number of rows actually inserted
#[instrument(skip(pool, watches), fields(count = watches.len()))]
pub async fn insert_watches(pool: &DbPool, watches: &[YoutubeWatch]) -> Result<usize> {
    debug!("Inserting watch events");

    let mut conn = pool.get()?;

    let inserted = execute_with_retry(&mut conn, |conn| {
        conn.transaction(|conn| {
            let mut inserted = 0;
            for watch in watches {
                inserted += diesel::insert_or_ignore_into(youtube_watches::table)
                    .values(watch)
                    .execute(conn)?;
            }
            Ok::<_, diesel::result::Error>(inserted)
        })
    })
    .await?;

    info!("Inserted {} of {} watch events", inserted, watches.len());
    Ok(inserted)
}

/// Lists watch events of a user, newest first
///
/// ### Arguments
///
/// * `since` - Only return watches at or after this time when set
#[instrument(skip(pool))]
pub fn list_watches(pool: &DbPool, user_id: &str, since: Option<NaiveDateTime>) -> Result<Vec<YoutubeWatch>> {
    let conn = &mut pool.get()?;

    let mut query = youtube_watches::table
        .filter(youtube_watches::user_id.eq(user_id))
        .into_boxed();

    if let Some(since) = since {
        query = query.filter(youtube_watches::watched_at.ge(since));
    }

    let result = query
        .order(youtube_watches::watched_at.desc())
        .select(YoutubeWatch::as_select())
        .load(conn)?;

    debug!("Retrieved {} watch events", result.len());
    Ok(result)
}

/// Distinct video ids of a user that have no statistics yet
///
/// Videos never looked up come first, then those whose last lookup is oldest.
#[instrument(skip(pool))]
pub fn list_video_ids_missing_details(pool: &DbPool, user_id: &str, limit: i64) -> Result<Vec<String>> {
    let conn = &mut pool.get()?;

    // NULL sorts first in SQLite; every watch of a video shares its checked time
    let rows = youtube_watches::table
        .filter(youtube_watches::user_id.eq(user_id))
        .filter(youtube_watches::view_count.is_null())
        .filter(youtube_watches::duration_seconds.is_null())
        .order((youtube_watches::details_checked_at.asc(), youtube_watches::video_id.asc()))
        .select(youtube_watches::video_id)
        .load::<String>(conn)?;

    let mut seen = HashSet::new();
    let result: Vec<String> = rows
        .into_iter()
        .filter(|video_id| seen.insert(video_id.clone()))
        .take(usize::try_from(limit).unwrap_or(0))
        .collect();

    debug!("Found {} videos without details", result.len());
    Ok(result)
}

/// Records that a details lookup ran for these videos
///
/// ### Returns
///
/// A Result containing the number of watch rows stamped
#[instrument(skip(pool, video_ids), fields(count = video_ids.len()))]
pub async fn mark_videos_checked(pool: &DbPool, user_id: &str, video_ids: &[String], at: NaiveDateTime) -> Result<usize> {
    let mut conn = pool.get()?;

    let rows = diesel::update(
        youtube_watches::table
            .filter(youtube_watches::user_id.eq(user_id.to_string()))
            .filter(youtube_watches::video_id.eq_any(video_ids.to_vec())),
    )
    .set(youtube_watches::details_checked_at.eq(Some(at)))
    .execute_with_retry(&mut conn).await?;

    Ok(rows)
}

/// Stores fetched statistics on every watch of that video
///
/// ### Returns
///
/// A Result containing the number of rows updated
#[instrument(skip(pool, details), fields(video_id = %details.video_id))]
pub async fn update_video_details(pool: &DbPool, user_id: &str, details: &VideoDetails) -> Result<usize> {
    let mut conn = pool.get()?;

    let rows = diesel::update(
        youtube_watches::table
            .filter(youtube_watches::user_id.eq(user_id.to_string()))
            .filter(youtube_watches::video_id.eq(details.video_id.clone())),
    )
    .set((
        youtube_watches::view_count.eq(details.view_count),
        youtube_watches::like_count.eq(details.like_count),
        youtube_watches::duration_seconds.eq(details.duration_seconds),
        youtube_watches::thumbnail_url.eq(details.thumbnail_url.clone()),
    ))
    .execute_with_retry(&mut conn).await?;

    debug!("Updated {} watch rows", rows);
    Ok(rows)
}
