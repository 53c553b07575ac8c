use crate::db::{execute_with_retry, DbPool, ExecuteWithRetry};
use crate::models::{OauthState, SpotifyToken};
use crate::schema::{oauth_states, spotify_tokens};
use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use diesel::upsert::excluded;
use anyhow::Result;
use rand::distr::{Alphanumeric, SampleString};
use tracing::{instrument, debug, info, warn};

/// How long an authorization `state` stays valid
pub const OAUTH_STATE_TTL_MINUTES: i64 = 10;

const OAUTH_STATE_LEN: usize = 32;

/// Inserts or replaces the Spotify tokens of a user
#[instrument(skip(pool, token), fields(user_id = %token.user_id))]
pub async fn save_token(pool: &DbPool, token: SpotifyToken) -> Result<SpotifyToken> {
    debug!("Saving Spotify token");

    let mut conn = pool.get()?;

    execute_with_retry(&mut conn, |conn| {
        diesel::insert_into(spotify_tokens::table)
            .values(&token)
            .on_conflict(spotify_tokens::user_id)
            .do_update()
            .set((
                spotify_tokens::access_token.eq(excluded(spotify_tokens::access_token)),
                spotify_tokens::refresh_token.eq(excluded(spotify_tokens::refresh_token)),
                spotify_tokens::expires_at.eq(excluded(spotify_tokens::expires_at)),
                spotify_tokens::scope.eq(excluded(spotify_tokens::scope)),
                spotify_tokens::updated_at.eq(excluded(spotify_tokens::updated_at)),
            ))
            .execute(conn)
    })
    .await?;

    info!("Stored Spotify token, expires at {}", token.expires_at);
    Ok(token)
}

/// Retrieves the stored Spotify tokens of a user
#[instrument(skip(pool))]
pub fn get_token(pool: &DbPool, user_id: &str) -> Result<Option<SpotifyToken>> {
    let conn = &mut pool.get()?;

    let result = spotify_tokens::table
        .filter(spotify_tokens::user_id.eq(user_id))
        .select(SpotifyToken::as_select())
        .first(conn)
        .optional()?;

    Ok(result)
}

/// Creates a fresh authorization `state` for a user
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `user_id` - The user starting the authorization
/// * `now` - Creation time, used for expiry
///
/// ### Returns
///
/// A Result containing the random state string to send to the provider
#[instrument(skip(pool))]
pub async fn create_oauth_state(pool: &DbPool, user_id: &str, now: NaiveDateTime) -> Result<String> {
    let state = Alphanumeric.sample_string(&mut rand::rng(), OAUTH_STATE_LEN);

    let row = OauthState {
        state: state.clone(),
        user_id: user_id.to_string(),
        created_at: now,
    };

    let mut conn = pool.get()?;

    diesel::insert_into(oauth_states::table)
        .values(row)
        .execute_with_retry(&mut conn).await?;

    debug!("Created OAuth state");
    Ok(state)
}

/// Consumes an authorization `state`, returning the user that created it
///
/// The state is deleted whether or not it is still valid, and expired states
/// of every user are purged along the way.
///
/// ### Returns
///
/// A Result containing Some(user_id) if the state existed and is younger
/// than ten minutes, or None otherwise
#[instrument(skip(pool, state))]
pub async fn consume_oauth_state(pool: &DbPool, state: &str, now: NaiveDateTime) -> Result<Option<String>> {
    let cutoff = now - Duration::minutes(OAUTH_STATE_TTL_MINUTES);

    let mut conn = pool.get()?;

    let found = execute_with_retry(&mut conn, |conn| {
        conn.transaction(|conn| {
            let found = oauth_states::table
                .filter(oauth_states::state.eq(state))
                .select(OauthState::as_select())
                .first(conn)
                .optional()?;

            diesel::delete(oauth_states::table.filter(oauth_states::state.eq(state))).execute(conn)?;
            diesel::delete(oauth_states::table.filter(oauth_states::created_at.lt(cutoff))).execute(conn)?;

            Ok::<_, diesel::result::Error>(found)
        })
    })
    .await?;

    match found {
        Some(row) if row.created_at >= cutoff => Ok(Some(row.user_id)),
        Some(_) => {
            warn!("OAuth state expired");
            Ok(None)
        }
        None => {
            warn!("Unknown OAuth state");
            Ok(None)
        }
    }
}
