/// lifedash: a personal life-dashboard backend
///
/// This library aggregates a workspace API (Notion pages and databases), its
/// own SQLite store of media, people, todos and tracking entries, and a
/// handful of third-party services (Spotify, YouTube, OMDb, Google Books and
/// an AI completion gateway) behind one authenticated JSON API.
///
/// ### Modules
///
/// - `db`, `schema`, `models`, `repo`: the relational store
/// - `http`: outbound fetches with timeout and retry
/// - `workspace`, `integrations`: clients for external services
/// - `enrich`, `sync`: metadata enrichment and todo synchronisation
/// - `views`, `format`, `palette`: filtering, display helpers and colour palettes
/// - `handlers`, `auth`, `extract`, `state`, `dto`, `errors`: the web API

/// Database connection module
pub mod db;

/// Data models module
pub mod models;

/// Repository module for database operations
pub mod repo;

/// Database schema module
pub mod schema;

pub mod auth;
pub mod config;
pub mod dto;
pub mod enrich;
pub mod errors;
pub mod extract;
pub mod format;
pub mod handlers;
pub mod http;
pub mod integrations;
pub mod palette;
pub mod state;
pub mod sync;
pub mod takeout;
pub mod views;
pub mod workspace;

#[cfg(test)]
pub mod test_utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use handlers::*;
use state::AppState;

/// Largest Takeout export accepted by the import route
const IMPORT_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Creates the application router
///
/// ### Arguments
///
/// * `state` - Pool, configuration and external clients shared by all handlers
///
/// ### Returns
///
/// An Axum Router with every route, request tracing and CORS
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Media
        .route("/media", get(list_media_handler).post(create_media_handler))
        .route("/media/fill-descriptions", post(fill_descriptions_handler))
        .route(
            "/media/{id}",
            get(get_media_handler).patch(update_media_handler).delete(delete_media_handler),
        )
        .route("/media/{id}/fill-description", post(fill_description_handler))
        .route("/media/{id}/refresh", post(refresh_media_handler))
        // Lookups
        .route("/lookup/imdb/{imdb_id}", get(lookup_imdb_handler))
        .route("/lookup/books", get(lookup_books_handler))
        // People
        .route("/people", get(list_people_handler).post(create_person_handler))
        .route("/people/birthdays", get(upcoming_birthdays_handler))
        .route(
            "/people/{id}",
            get(get_person_handler).patch(update_person_handler).delete(delete_person_handler),
        )
        // Todos
        .route("/todos", get(list_todos_handler).post(create_todo_handler))
        .route("/todos/sync", post(sync_todos_handler))
        .route("/todos/{id}", patch(update_todo_handler).delete(delete_todo_handler))
        .route("/todos/{id}/toggle", post(toggle_todo_handler))
        // Tracking
        .route("/tracking", get(list_tracking_handler).post(create_tracking_handler))
        .route("/tracking/summary", get(tracking_summary_handler))
        .route("/tracking/{id}", axum::routing::delete(delete_tracking_handler))
        // YouTube
        .route(
            "/youtube/import",
            post(import_youtube_handler).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .route("/youtube/history", get(youtube_history_handler))
        .route("/youtube/stats", get(youtube_stats_handler))
        .route("/youtube/enrich", post(enrich_youtube_handler))
        // Spotify
        .route("/spotify/login", get(spotify_login_handler))
        .route("/spotify/callback", get(spotify_callback_handler))
        .route("/spotify/now-playing", get(now_playing_handler))
        .route("/spotify/recent", get(recent_tracks_handler))
        // Finances and palettes
        .route("/finances/summary", get(finance_summary_handler))
        .route("/palette", post(palette_handler))
        .method_not_allowed_fallback(extract::method_not_allowed)
        .fallback(extract::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs the embedded migrations
///
/// ### Arguments
///
/// * `conn` - A mutable reference to a SQLite connection
///
/// ### Errors
///
/// Returns an error if a migration fails to apply
pub fn run_migrations(conn: &mut diesel::SqliteConnection) -> anyhow::Result<()> {
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    // Define the embedded migrations
    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("failed to run migrations: {}", e))?;
    tracing::info!("Applied {} migrations", applied.len());
    Ok(())
}
