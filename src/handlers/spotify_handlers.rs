use axum::extract::State;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::auth::AuthUser;
use crate::dto::{LoginResponse, RecentQuery, SpotifyCallbackQuery};
use crate::errors::ApiError;
use crate::extract::{Json, Query};
use crate::integrations::spotify::REFRESH_MARGIN_SECS;
use crate::integrations::{NowPlaying, RecentPlay, SpotifyError};
use crate::repo;
use crate::state::AppState;

impl From<SpotifyError> for ApiError {
    fn from(err: SpotifyError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

/// A usable access token for the user, refreshing it when it is about to expire
async fn access_token(state: &AppState, user_id: &str) -> Result<String, ApiError> {
    let spotify = state.services.spotify()?;
    let token = repo::get_token(&state.pool, user_id)
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFoundWithMessage("Spotify is not connected".to_string()))?;

    let now = Utc::now().naive_utc();
    if !token.expires_within(now, Duration::seconds(REFRESH_MARGIN_SECS)) {
        return Ok(token.access_token);
    }

    debug!("Refreshing Spotify access token");
    let grant = spotify.refresh(&token.refresh_token).await?;
    let refreshed = grant
        .into_token(user_id, now, Some(token.refresh_token))
        .ok_or_else(|| ApiError::Upstream("Spotify returned no refresh token".to_string()))?;
    let saved = repo::save_token(&state.pool, refreshed).await.map_err(ApiError::Database)?;

    Ok(saved.access_token)
}

/// Handler starting the Spotify authorization flow
///
/// This function handles GET requests to `/spotify/login`. A single-use
/// state is stored so the callback can be tied back to this user.
///
/// ### Returns
///
/// The URL the user should visit
#[instrument(skip(state, user))]
pub async fn spotify_login_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<LoginResponse>, ApiError> {
    let spotify = state.services.spotify()?;
    let oauth_state = repo::create_oauth_state(&state.pool, &user.user_id, Utc::now().naive_utc())
        .await
        .map_err(ApiError::Database)?;

    let url = spotify.authorize_url(&oauth_state)?;
    Ok(Json(LoginResponse { url }))
}

/// Handler Spotify redirects back to
///
/// This function handles GET requests to `/spotify/callback`. It needs no
/// bearer token; the state parameter identifies the user.
///
/// ### Errors
///
/// * 400 if the user denied access, or the code or state is missing, unknown or expired
/// * 502 if the code exchange fails
#[instrument(skip(state, query))]
pub async fn spotify_callback_handler(
    State(state): State<AppState>,
    Query(query): Query<SpotifyCallbackQuery>,
) -> Result<Json<Value>, ApiError> {
    let spotify = state.services.spotify()?;

    if let Some(error) = query.error {
        warn!("Spotify authorization was refused: {}", error);
        return Err(ApiError::BadRequest(format!("Spotify authorization failed: {}", error)));
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Err(ApiError::BadRequest("code and state are required".to_string()));
    };

    let now = Utc::now().naive_utc();
    let user_id = repo::consume_oauth_state(&state.pool, &oauth_state, now)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::BadRequest("unknown or expired state".to_string()))?;

    let grant = spotify.exchange_code(&code).await?;
    let token = grant
        .into_token(&user_id, now, None)
        .ok_or_else(|| ApiError::Upstream("Spotify returned no refresh token".to_string()))?;
    repo::save_token(&state.pool, token).await.map_err(ApiError::Database)?;

    info!("Connected Spotify");
    Ok(Json(json!({"connected": true})))
}

/// Handler for the track playing right now, or `null`
///
/// This function handles GET requests to `/spotify/now-playing`.
#[instrument(skip(state, user))]
pub async fn now_playing_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Option<NowPlaying>>, ApiError> {
    let token = access_token(&state, &user.user_id).await?;
    let playing = state.services.spotify()?.currently_playing(&token).await?;
    Ok(Json(playing))
}

/// Handler for recently played tracks
///
/// This function handles GET requests to `/spotify/recent`.
#[instrument(skip(state, user))]
pub async fn recent_tracks_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<RecentPlay>>, ApiError> {
    if !(1..=50).contains(&query.limit) {
        return Err(ApiError::BadRequest("limit must be between 1 and 50".to_string()));
    }

    let token = access_token(&state, &user.user_id).await?;
    let plays = state.services.spotify()?.recently_played(&token, query.limit).await?;
    Ok(Json(plays))
}
