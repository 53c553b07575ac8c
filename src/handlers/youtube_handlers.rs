use axum::{body::Bytes, extract::State};
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::auth::AuthUser;
use crate::dto::{BatchDto, HistoryQuery, StatsQuery};
use crate::enrich::{self, YoutubeEnrichReport};
use crate::errors::ApiError;
use crate::extract::{Json, Query};
use crate::models::YoutubeWatch;
use crate::repo;
use crate::state::AppState;
use crate::takeout::{self, ImportReport};
use crate::views::{self, Group, WatchStats};

/// Handler importing a Google Takeout `watch-history.json`
///
/// This function handles POST requests to `/youtube/import`. The body is
/// the export file as is. Watches already stored are counted as duplicates.
///
/// ### Returns
///
/// Counts of parsed, inserted, duplicate and skipped records
#[instrument(skip(state, user, body), fields(bytes = body.len()))]
pub async fn import_youtube_handler(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<ImportReport>, ApiError> {
    let parsed = takeout::parse_watch_history(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let watches: Vec<YoutubeWatch> = parsed
        .watches
        .into_iter()
        .map(|w| w.into_watch(&user.user_id))
        .collect();
    let inserted = repo::insert_watches(&state.pool, &watches)
        .await
        .map_err(ApiError::Database)?;

    let report = ImportReport {
        parsed: watches.len(),
        inserted,
        duplicates: watches.len() - inserted,
        skipped: parsed.skipped,
    };
    info!(?report, "Imported watch history");
    Ok(Json(report))
}

/// Handler for watch history grouped by day, newest first
///
/// This function handles GET requests to `/youtube/history`. `q` searches
/// titles and channel names.
#[instrument(skip(state, user))]
pub async fn youtube_history_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Group<YoutubeWatch>>>, ApiError> {
    let now = Utc::now().naive_utc();
    let watches = repo::list_watches(&state.pool, &user.user_id, query.range.start(now))
        .map_err(ApiError::Database)?;

    let watches: Vec<YoutubeWatch> = watches
        .into_iter()
        .filter(|w| query.range.contains(w.watched_at, now))
        .filter(|w| views::matches_search(query.q.as_deref(), &[Some(&w.title), w.channel_name.as_deref()]))
        .collect();
    debug!("Returning {} watches", watches.len());

    Ok(Json(views::group_by_day(watches, |w| w.watched_at, now.date())))
}

/// Handler for watch statistics
///
/// This function handles GET requests to `/youtube/stats`.
#[instrument(skip(state, user))]
pub async fn youtube_stats_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<WatchStats>, ApiError> {
    let now = Utc::now().naive_utc();
    let watches: Vec<YoutubeWatch> = repo::list_watches(&state.pool, &user.user_id, query.range.start(now))
        .map_err(ApiError::Database)?
        .into_iter()
        .filter(|w| query.range.contains(w.watched_at, now))
        .collect();

    Ok(Json(views::watch_stats(&watches, query.top)))
}

/// Handler fetching statistics for watches that have none
///
/// This function handles POST requests to `/youtube/enrich`.
#[instrument(skip(state, user, payload))]
pub async fn enrich_youtube_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BatchDto>,
) -> Result<Json<YoutubeEnrichReport>, ApiError> {
    let limit = payload.validated_limit().map_err(ApiError::BadRequest)?;
    let report = enrich::enrich_youtube(&state, &user.user_id, limit).await?;
    Ok(Json(report))
}
