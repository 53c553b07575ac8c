use super::*;
use axum::body::to_bytes;
use axum::response::IntoResponse;

/// Helper to extract status code and body JSON from an ApiError response
async fn error_response(error: ApiError) -> (StatusCode, serde_json::Value) {
    let response = error.into_response();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_database_error_response_hides_detail() {
    let error = ApiError::Database(anyhow::anyhow!("connection refused"));
    let (status, body) = error_response(error).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_not_found_response() {
    let (status, body) = error_response(ApiError::NotFound).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Resource not found");
}

#[tokio::test]
async fn test_not_found_with_message_response() {
    let error = ApiError::NotFoundWithMessage("No description found".to_string());
    let (status, body) = error_response(error).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No description found");
}

#[tokio::test]
async fn test_bad_request_response() {
    let msg = "Title must not be empty".to_string();
    let (status, body) = error_response(ApiError::BadRequest(msg.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], msg);
}

#[tokio::test]
async fn test_unauthorized_response() {
    let (status, body) = error_response(ApiError::Unauthorized("Missing Authorization header".to_string())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing Authorization header");
}

#[tokio::test]
async fn test_upstream_response() {
    let (status, body) = error_response(ApiError::Upstream("OMDb returned HTTP 500".to_string())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "OMDb returned HTTP 500");
}

#[tokio::test]
async fn test_not_configured_response() {
    let (status, body) = error_response(ApiError::NotConfigured("Spotify".to_string())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Spotify is not configured");
}

#[tokio::test]
async fn test_method_not_allowed_response() {
    let (status, body) = error_response(ApiError::MethodNotAllowed).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed");
}
