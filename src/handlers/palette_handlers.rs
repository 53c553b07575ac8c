use axum::extract::State;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::auth::AuthUser;
use crate::dto::PaletteDto;
use crate::errors::ApiError;
use crate::extract::Json;
use crate::http::{self, FetchError};
use crate::palette::{self, Swatch};
use crate::state::Services;

/// Handler computing the colour palette of an image URL
///
/// This function handles POST requests to `/palette`. The image is fetched
/// with the shared client's timeout and retry policy, read up to
/// [`palette::MAX_IMAGE_BYTES`] and decoded on the blocking pool.
///
/// ### Errors
///
/// * 400 for an invalid URL or count, an image over the size limit, or bytes that are not an image
/// * 502 if the image cannot be fetched
#[instrument(skip(services, _user, payload), fields(url = %payload.url, count = payload.count))]
pub async fn palette_handler(
    State(services): State<Arc<Services>>,
    _user: AuthUser,
    Json(payload): Json<PaletteDto>,
) -> Result<Json<Vec<Swatch>>, ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;

    let response = services
        .http
        .send(|c| c.get(&payload.url))
        .await
        .map_err(|e| ApiError::Upstream(format!("could not fetch image: {}", e)))?;
    let bytes = http::read_body_capped(response, palette::MAX_IMAGE_BYTES)
        .await
        .map_err(|e| match e {
            FetchError::TooLarge { .. } => ApiError::BadRequest(format!("image is too large: {}", e)),
            e => ApiError::Upstream(format!("could not read image: {}", e)),
        })?;
    debug!("Fetched {} bytes", bytes.len());

    let count = payload.count;
    let swatches = tokio::task::spawn_blocking(move || palette::extract_palette(&bytes, count))
        .await
        .map_err(|e| ApiError::Database(anyhow::anyhow!("palette task failed: {}", e)))?
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(swatches))
}
