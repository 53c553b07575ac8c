use axum::Json;
use serde_json::{json, Value};

/// Liveness check, no authentication
pub async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
