use axum::extract::State;
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::auth::AuthUser;
use crate::dto::{BatchDto, CreateMediaDto, FillDescriptionQuery, UpdateMediaDto};
use crate::enrich::{self, BatchReport, DescriptionOutcome, RefreshOutcome};
use crate::errors::ApiError;
use crate::extract::{Json, MultiQuery, Path, Query};
use crate::models::Media;
use crate::repo;
use crate::state::AppState;
use crate::views::MediaQuery;

/// Handler for listing media
///
/// This function handles GET requests to `/media`. Filters accept repeated
/// keys, e.g. `?status=planned&status=in_progress`.
///
/// ### Arguments
///
/// * `state` - The application state
/// * `user` - The authenticated user
/// * `query` - Search text, filters, date range and sort order
///
/// ### Returns
///
/// The matching media rows as JSON
#[instrument(skip(state, user))]
pub async fn list_media_handler(
    State(state): State<AppState>,
    user: AuthUser,
    MultiQuery(query): MultiQuery<MediaQuery>,
) -> Result<Json<Vec<Media>>, ApiError> {
    let media = repo::list_media(&state.pool, &user.user_id).map_err(ApiError::Database)?;
    let total = media.len();

    let media = query.apply(media, Utc::now().naive_utc());
    debug!("Returning {} of {} media rows", media.len(), total);

    Ok(Json(media))
}

/// Handler for creating a media row
///
/// This function handles POST requests to `/media`. When a workspace media
/// database is configured a page is created as well and its id stored on
/// the row; failing to create the page does not fail the request.
///
/// ### Returns
///
/// The created row as JSON
#[instrument(skip(state, user, payload), fields(title = %payload.title))]
pub async fn create_media_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateMediaDto>,
) -> Result<Json<Media>, ApiError> {
    info!("Creating media");

    let media = payload.into_media(&user.user_id).map_err(ApiError::BadRequest)?;
    let mut media = repo::create_media(&state.pool, media).await.map_err(ApiError::Database)?;

    if let Some(page_id) = enrich::mirror_created(&state, &media).await {
        media.notion_page_id = Some(page_id);
        media = repo::save_media(&state.pool, media)
            .await
            .map_err(ApiError::Database)?
            .ok_or(ApiError::NotFound)?;
    }

    info!("Created media with id: {}", media.id);
    Ok(Json(media))
}

/// Handler for retrieving one media row
///
/// This function handles GET requests to `/media/{id}`.
#[instrument(skip(state, user))]
pub async fn get_media_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(media_id): Path<String>,
) -> Result<Json<Media>, ApiError> {
    debug!("Retrieving media");

    let media = repo::get_media(&state.pool, &user.user_id, &media_id)
        .map_err(ApiError::Database)?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(media))
}

/// Handler for updating a media row
///
/// This function handles PATCH requests to `/media/{id}`. Only the fields
/// present in the body change. The workspace page, if any, is updated on a
/// best-effort basis.
#[instrument(skip(state, user, payload))]
pub async fn update_media_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(media_id): Path<String>,
    Json(payload): Json<UpdateMediaDto>,
) -> Result<Json<Media>, ApiError> {
    info!("Updating media");

    let media = repo::get_media(&state.pool, &user.user_id, &media_id)
        .map_err(ApiError::Database)?
        .ok_or(ApiError::NotFound)?;

    let media = payload.apply(media, Utc::now().naive_utc()).map_err(ApiError::BadRequest)?;
    let media = repo::save_media(&state.pool, media)
        .await
        .map_err(ApiError::Database)?
        .ok_or(ApiError::NotFound)?;

    enrich::mirror_updated(&state, &media).await;

    Ok(Json(media))
}

/// Handler for deleting a media row
///
/// This function handles DELETE requests to `/media/{id}`. A linked
/// workspace page is archived on a best-effort basis.
#[instrument(skip(state, user))]
pub async fn delete_media_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(media_id): Path<String>,
) -> Result<Json<()>, ApiError> {
    info!("Deleting media with id: {}", media_id);

    let media = repo::get_media(&state.pool, &user.user_id, &media_id)
        .map_err(ApiError::Database)?
        .ok_or(ApiError::NotFound)?;

    repo::delete_media(&state.pool, &user.user_id, &media_id)
        .await
        .map_err(ApiError::Database)?;

    enrich::mirror_deleted(&state, &media).await;

    info!("Successfully deleted media with id: {}", media_id);
    Ok(Json(()))
}

/// Handler for filling the description of one media row
///
/// This function handles POST requests to `/media/{id}/fill-description`.
///
/// ### Arguments
///
/// * `media_id` - The row to fill
/// * `query` - `force=true` replaces an existing description
///
/// ### Returns
///
/// The updated row, where the text came from and whether the workspace
/// page was updated
#[instrument(skip(state, user))]
pub async fn fill_description_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(media_id): Path<String>,
    Query(query): Query<FillDescriptionQuery>,
) -> Result<Json<DescriptionOutcome>, ApiError> {
    let outcome = enrich::fill_description(&state, &user.user_id, &media_id, query.force).await?;
    Ok(Json(outcome))
}

/// Handler for refreshing metadata of one media row from OMDb or Google Books
///
/// This function handles POST requests to `/media/{id}/refresh`.
#[instrument(skip(state, user))]
pub async fn refresh_media_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(media_id): Path<String>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    let outcome = enrich::refresh_metadata(&state, &user.user_id, &media_id).await?;
    Ok(Json(outcome))
}

/// Handler for filling descriptions of rows that have none
///
/// This function handles POST requests to `/media/fill-descriptions`.
/// Per-row failures are listed in the report rather than failing the request.
#[instrument(skip(state, user, payload))]
pub async fn fill_descriptions_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BatchDto>,
) -> Result<Json<BatchReport>, ApiError> {
    let limit = payload.validated_limit().map_err(ApiError::BadRequest)?;
    let report = enrich::fill_missing_descriptions(&state, &user.user_id, limit).await?;
    Ok(Json(report))
}
