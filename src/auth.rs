//! Bearer-token authentication extractor for axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::debug;

use crate::errors::ApiError;
use crate::state::AppState;

/// The user a request acts for
///
/// Extracting it checks `Authorization: Bearer <token>` against the
/// configured API token; the session's user is the configured owner.
/// When no API token is configured every request is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

/// Compares two byte strings without stopping at the first difference
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".into()))?;

        let Some(expected) = state.config.api_token.as_deref() else {
            debug!("Rejecting request, no API token configured");
            return Err(ApiError::Unauthorized("Invalid token".into()));
        };

        if !constant_time_eq(token.trim().as_bytes(), expected.as_bytes()) {
            return Err(ApiError::Unauthorized("Invalid token".into()));
        }

        Ok(AuthUser {
            user_id: state.config.owner_id.clone(),
        })
    }
}
