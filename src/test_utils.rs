use crate::*;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, NaiveDateTime};
use diesel::connection::SimpleConnection;
use diesel::sql_types::Text;
use diesel::{QueryableByName, RunQueryDsl};
use proptest::prelude::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::config::{base_config, Config};
use crate::http::{HttpClient, RetryPolicy};
use crate::integrations::{AiClient, BooksClient, OmdbClient, SpotifyClient, YoutubeClient};
use crate::workspace::WorkspaceClient;
use crate::models::{Media, MediaStatus, MediaType, StringList};
use crate::state::{AppState, Services};

/// Bearer token accepted by `test_state`
pub const TEST_TOKEN: &str = "test-token";

/// Sets up a test database with migrations applied
///
/// ### Returns
///
/// An Arc-wrapped database connection pool connected to the in-memory database
pub fn setup_test_db() -> Arc<db::DbPool> {
    // Plain ":memory:" gives each connection its own database, so use a
    // unique shared-cache URI per test
    let unique_id = uuid::Uuid::new_v4();
    let database_url = format!("file:test_{}?mode=memory&cache=shared", unique_id);
    let pool = db::init_pool(&database_url).expect("Failed to build pool");

    let mut conn = pool.get().expect("Failed to get connection");
    conn.batch_execute("PRAGMA foreign_keys = ON").unwrap();
    run_migrations(&mut conn).expect("Failed to run migrations");

    Arc::new(pool)
}

/// Serves `router` on an ephemeral local port and returns its base URL
pub async fn spawn_mock_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// An HTTP client whose retries wait milliseconds instead of seconds
pub fn fast_http_client() -> HttpClient {
    let policy = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    };
    HttpClient::new(policy, Duration::from_secs(5)).unwrap()
}

/// Default configuration with a known API token and no integrations
pub fn test_config() -> Config {
    let mut config = base_config(None);
    config.api_token = Some(TEST_TOKEN.to_string());
    config
}

/// Services with every optional integration disabled
///
/// Books points at a closed port so an accidental lookup fails fast.
pub fn test_services() -> Services {
    let http = fast_http_client();
    Services {
        books: BooksClient::with_base_url(http.clone(), None, "http://127.0.0.1:9"),
        http,
        workspace: None,
        omdb: None,
        youtube: None,
        spotify: None,
        ai: None,
    }
}

pub fn test_state(pool: Arc<db::DbPool>) -> AppState {
    AppState::new(pool, test_config(), test_services())
}

/// Sends a request with the test token and returns the status and JSON body
///
/// An empty body comes back as `Value::Null`.
pub async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("Authorization", format!("Bearer {}", TEST_TOKEN));

    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[derive(QueryableByName, Debug)]
struct TableName {
    #[diesel(sql_type = Text)]
    name: String,
}

/// The test database has every table and the app answers on it
#[tokio::test]
async fn test_setup_test_db() {
    let pool = setup_test_db();

    let mut conn = pool.get().unwrap();
    let table_names: Vec<TableName> = diesel::sql_query("SELECT name FROM sqlite_master WHERE type='table'")
        .load(&mut conn)
        .expect("Failed to load table names");

    let expected_tables = vec![
        "media", "people", "todos", "tracking_entries", "youtube_watches",
        "spotify_tokens", "oauth_states", "__diesel_schema_migrations",
    ];

    for table in expected_tables {
        assert!(table_names.iter().any(|t| t.name == table), "Table '{}' not found in database", table);

        let query = format!("SELECT COUNT(*) FROM {}", table);
        let result = diesel::sql_query(&query).execute(&mut conn);
        assert!(result.is_ok(), "Failed to query table '{}': {:?}", table, result.err());
    }
    drop(conn);

    let app = create_app(test_state(pool));
    let (status, body) = send_json(&app, "GET", "/media", None).await;
    assert_eq!(status, StatusCode::OK, "unexpected body {body}");
}

/// Generates strings with whitespace, unicode and quotes mixed in
pub fn arb_messy_string() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_./:-]{0,24}",
        "\\PC{0,16}",
        Just(String::new()),
        Just("  spaced  ".to_string()),
        Just("quote\"and'apostrophe".to_string()),
    ]
}

/// Generates a NaiveDateTime within 2020-01-01 to 2030-01-01
pub fn arb_naive_datetime() -> impl Strategy<Value = NaiveDateTime> {
    (1_577_836_800i64..1_893_456_000i64)
        .prop_map(|ts| DateTime::from_timestamp(ts, 0).unwrap().naive_utc())
}

pub fn arb_media_type() -> impl Strategy<Value = MediaType> {
    prop_oneof![
        Just(MediaType::Movie),
        Just(MediaType::Series),
        Just(MediaType::Book),
        Just(MediaType::Album),
        Just(MediaType::Podcast),
        Just(MediaType::Game),
    ]
}

pub fn arb_media_status() -> impl Strategy<Value = MediaStatus> {
    prop_oneof![
        Just(MediaStatus::Planned),
        Just(MediaStatus::InProgress),
        Just(MediaStatus::Completed),
        Just(MediaStatus::Dropped),
    ]
}

/// Generates a media row with a short title over a small alphabet so
/// searches and ties actually happen
pub fn arb_media() -> impl Strategy<Value = Media> {
    (
        "[a-dA-D ]{0,6}",
        arb_media_type(),
        arb_media_status(),
        prop::option::of(1i32..=10),
        prop::option::of(1950i32..2030),
        prop::option::of("[a-d]{1,5}"),
        arb_naive_datetime(),
        arb_naive_datetime(),
    )
        .prop_map(|(title, media_type, status, rating, year, creator, created_at, updated_at)| {
            let mut media = Media::new("user", title, media_type, status);
            media.rating = rating;
            media.year = year;
            media.creator = creator;
            media.genres = StringList::default();
            media.created_at = created_at;
            media.updated_at = updated_at;
            media
        })
}

// ============================================================================
// Fake upstream services
// ============================================================================

/// One request received by the fake upstream
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub path: String,
    pub body: Value,
}

/// Shared state of the fake upstream
#[derive(Clone, Default)]
pub struct FakeUpstream {
    /// Workspace write calls (page create, update, archive)
    pub calls: Arc<std::sync::Mutex<Vec<Call>>>,
    /// Pages returned by any workspace database query
    pub pages: Arc<std::sync::Mutex<Vec<Value>>>,
}

impl FakeUpstream {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_pages(&self, pages: Vec<Value>) {
        *self.pages.lock().unwrap() = pages;
    }

    fn record(&self, method: &str, path: String, body: Value) {
        self.calls.lock().unwrap().push(Call { method: method.to_string(), path, body });
    }
}

mod fake {
    use super::FakeUpstream;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::{Form, Json};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    pub fn page(id: &str) -> Value {
        json!({"id": id, "url": format!("https://notion.test/{}", id), "archived": false, "properties": {}})
    }

    pub async fn omdb(Query(params): Query<HashMap<String, String>>) -> Response {
        match params.get("i").map(String::as_str) {
            Some("tt0113277") => Json(json!({
                "Title": "Heat",
                "Year": "1995",
                "Plot": "A group of high-end professional thieves start to feel the heat.",
                "Poster": "https://img.test/heat.jpg",
                "Genre": "Action, Crime, Drama",
                "Director": "Michael Mann",
                "Runtime": "170 min",
                "imdbRating": "8.3",
                "Type": "movie",
                "Response": "True"
            }))
            .into_response(),
            Some("tt0000500") => (StatusCode::INTERNAL_SERVER_ERROR, "omdb down").into_response(),
            _ => Json(json!({"Response": "False", "Error": "Incorrect IMDb ID."})).into_response(),
        }
    }

    pub async fn volumes(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let q = params.get("q").cloned().unwrap_or_default();
        if q == "isbn:9780441013593" || q.starts_with("intitle:Dune") {
            Json(json!({"totalItems": 1, "items": [{
                "id": "vol-1",
                "volumeInfo": {
                    "title": "Dune",
                    "authors": ["Frank Herbert"],
                    "description": "<p>Set on the desert planet <b>Arrakis</b>.</p>",
                    "publishedDate": "1965-08-01",
                    "categories": ["Fiction"],
                    "imageLinks": {"thumbnail": "http://books.test/dune.jpg"},
                    "industryIdentifiers": [{"type": "ISBN_13", "identifier": "9780441013593"}]
                }
            }]}))
        } else {
            Json(json!({"totalItems": 0}))
        }
    }

    /// Answers UNKNOWN for titles containing "Mystery"
    pub async fn completions(Json(body): Json<Value>) -> Json<Value> {
        let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
        let content = if prompt.contains("Mystery") { "UNKNOWN" } else { "A generated synopsis." };
        Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]}))
    }

    pub async fn query_database(State(fake): State<FakeUpstream>, Path(_db): Path<String>) -> Json<Value> {
        let pages = fake.pages.lock().unwrap().clone();
        Json(json!({"results": pages, "has_more": false, "next_cursor": null}))
    }

    pub async fn create_page(State(fake): State<FakeUpstream>, Json(body): Json<Value>) -> Json<Value> {
        fake.record("POST", "/pages".to_string(), body);
        Json(page("new-page"))
    }

    /// Pages with id "broken" fail with 400 so no retry happens
    pub async fn patch_page(State(fake): State<FakeUpstream>, Path(id): Path<String>, Json(body): Json<Value>) -> Response {
        fake.record("PATCH", format!("/pages/{}", id), body);
        if id == "broken" {
            return (StatusCode::BAD_REQUEST, Json(json!({"message": "validation_error"}))).into_response();
        }
        Json(page(&id)).into_response()
    }

    pub async fn videos(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let items: Vec<Value> = params
            .get("id")
            .map(|ids| ids.split(',').filter(|id| *id != "gone").map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default()
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "snippet": {"title": format!("Video {}", id), "channelTitle": "Channel"},
                    "statistics": {"viewCount": "1200", "likeCount": "34"},
                    "contentDetails": {"duration": "PT4M5S"}
                })
            })
            .collect();
        Json(json!({"items": items}))
    }

    pub async fn token(Form(form): Form<HashMap<String, String>>) -> Response {
        match form.get("grant_type").map(String::as_str) {
            Some("authorization_code") if form.get("code").map(String::as_str) == Some("good") => {
                Json(json!({"access_token": "a1", "refresh_token": "r1", "expires_in": 3600})).into_response()
            }
            Some("refresh_token") => Json(json!({"access_token": "a2", "expires_in": 3600})).into_response(),
            _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response(),
        }
    }

    pub async fn currently_playing(headers: HeaderMap) -> Response {
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer idle") => StatusCode::NO_CONTENT.into_response(),
            _ => Json(json!({
                "is_playing": true,
                "progress_ms": 1000,
                "item": {"name": "Teardrop", "duration_ms": 330000, "artists": [{"name": "Massive Attack"}]}
            }))
            .into_response(),
        }
    }

    pub async fn recently_played() -> Json<Value> {
        Json(json!({"items": [
            {"played_at": "2024-05-01T10:00:00Z", "track": {"name": "Angel", "duration_ms": 379000, "artists": [{"name": "Massive Attack"}]}}
        ]}))
    }

    pub async fn image() -> Response {
        let mut bytes = Vec::new();
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 30, 30]));
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        ([("content-type", "image/png")], bytes).into_response()
    }

    /// One byte more than a palette image may have
    pub async fn huge_image() -> Response {
        ([("content-type", "image/png")], vec![0u8; crate::palette::MAX_IMAGE_BYTES + 1]).into_response()
    }
}

/// Serves fake OMDb, Google Books, AI, workspace, YouTube and Spotify APIs
/// under one local server
///
/// Each service lives under its own prefix: `/omdb`, `/books`, `/ai`,
/// `/notion`, `/youtube`, `/spotify`. `/image.png` serves a small red PNG and
/// `/huge.png` a body over the palette size limit.
pub async fn spawn_fake_upstream() -> (String, FakeUpstream) {
    use axum::routing::{get, post};

    let fake = FakeUpstream::default();
    let router = Router::new()
        .route("/omdb/", get(fake::omdb))
        .route("/books/volumes", get(fake::volumes))
        .route("/ai/chat/completions", post(fake::completions))
        .route("/notion/databases/{db}/query", post(fake::query_database))
        .route("/notion/pages", post(fake::create_page))
        .route("/notion/pages/{id}", axum::routing::patch(fake::patch_page))
        .route("/youtube/videos", get(fake::videos))
        .route("/spotify/api/token", post(fake::token))
        .route("/spotify/me/player/currently-playing", get(fake::currently_playing))
        .route("/spotify/me/player/recently-played", get(fake::recently_played))
        .route("/image.png", get(fake::image))
        .route("/huge.png", get(fake::huge_image))
        .with_state(fake.clone());
    (spawn_mock_server(router).await, fake)
}

/// Services with every integration pointed at the fake upstream
pub fn fake_services(base: &str) -> Services {
    let http = fast_http_client();
    Services {
        workspace: Some(WorkspaceClient::with_base_url(http.clone(), "secret", format!("{}/notion", base))),
        omdb: Some(OmdbClient::with_base_url(http.clone(), "key", format!("{}/omdb", base))),
        books: BooksClient::with_base_url(http.clone(), None, format!("{}/books", base)),
        youtube: Some(YoutubeClient::with_base_url(http.clone(), "key", format!("{}/youtube", base))),
        spotify: Some(
            SpotifyClient::new(http.clone(), "id".into(), "secret".into(), "http://localhost/cb".into())
                .with_base_urls(format!("{}/spotify", base), format!("{}/spotify", base)),
        ),
        ai: Some(AiClient::new(http.clone(), format!("{}/ai", base), None, "test-model")),
        http,
    }
}

/// State whose integrations all talk to a fresh fake upstream, with
/// media, todos and finances databases configured
pub async fn fake_state(pool: Arc<db::DbPool>) -> (AppState, FakeUpstream) {
    let (base, fake) = spawn_fake_upstream().await;
    let mut config = test_config();
    config.notion_token = Some("secret".to_string());
    config.notion_media_db = Some("media-db".to_string());
    config.notion_todos_db = Some("todos-db".to_string());
    config.notion_finances_db = Some("finances-db".to_string());
    (AppState::new(pool, config, fake_services(&base)), fake)
}
