#![allow(dead_code)]

/// Common test utilities for lifedash integration tests
///
/// Everything here goes through the public library API, the same way the
/// server binary wires the application together.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use lifedash::{
    config::base_config,
    create_app,
    db::init_pool,
    state::{AppState, Services},
};
use serde_json::Value;
use std::sync::Arc;
use tower::Service;

/// Token the test application accepts
pub const TOKEN: &str = "integration-token";

/// Creates a test application backed by a private in-memory SQLite database
///
/// Each call gets a uniquely named shared-cache database, so pooled
/// connections see the same data while tests stay isolated. No external
/// integration is configured.
///
/// ### Returns
///
/// An Axum Router with every route, requiring `TOKEN`
pub fn create_test_app() -> Router {
    let database_url = format!("file:it_{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
    let pool = Arc::new(init_pool(&database_url).unwrap());

    // Run migrations on the in-memory database to set up the schema
    let conn = &mut pool.get().unwrap();
    lifedash::run_migrations(conn).unwrap();

    let mut config = base_config(None);
    config.api_token = Some(TOKEN.to_string());
    let services = Services::from_config(&config).unwrap();

    create_app(AppState::new(pool.clone(), config, services))
}

/// Sends an authenticated request and returns the status and parsed body
///
/// ### Arguments
///
/// * `app` - The test application
/// * `method` - HTTP method
/// * `uri` - Path and query string
/// * `body` - Optional JSON body
///
/// ### Returns
///
/// The response status and its JSON body, `Value::Null` when empty
pub async fn request(app: &mut Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("Authorization", format!("Bearer {}", TOKEN));

    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app.call(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Titles of a JSON array of rows, in order
pub fn titles(rows: &Value) -> Vec<String> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| row["title"].as_str().unwrap().to_string())
        .collect()
}
