/// Integration tests for todos
///
/// The workspace is not configured, so todos live only in the local store
/// and the sync route reports 503.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

/// Tests ordering: open before done, earlier due date first, undated last
#[tokio::test]
async fn test_todo_ordering() {
    let mut app = create_test_app();
    for (title, due) in [("Undated", None), ("Taxes", Some("2025-04-15")), ("Dentist", Some("2025-02-01"))] {
        let (status, _) = request(&mut app, "POST", "/todos", Some(json!({"title": title, "due": due}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, todos) = request(&mut app, "GET", "/todos", None).await;
    assert_eq!(titles(&todos), vec!["Dentist", "Taxes", "Undated"]);

    let dentist = todos[0]["id"].as_str().unwrap();
    request(&mut app, "POST", &format!("/todos/{}/toggle", dentist), None).await;

    let (_, todos) = request(&mut app, "GET", "/todos", None).await;
    assert_eq!(titles(&todos), vec!["Taxes", "Undated", "Dentist"]);
}

/// Tests that toggling twice reopens a todo and clears its completion time
#[tokio::test]
async fn test_toggle_twice_reopens() {
    let mut app = create_test_app();
    let (_, todo) = request(&mut app, "POST", "/todos", Some(json!({"title": "Call mum"}))).await;
    let uri = format!("/todos/{}/toggle", todo["id"].as_str().unwrap());

    let (_, done) = request(&mut app, "POST", &uri, None).await;
    assert_eq!(done["done"], true);

    let (status, reopened) = request(&mut app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["done"], false);
    assert_eq!(reopened["completed_at"], serde_json::Value::Null);
}

/// Tests that syncing without a workspace is reported as unavailable
#[tokio::test]
async fn test_sync_without_workspace() {
    let mut app = create_test_app();
    let (status, body) = request(&mut app, "POST", "/todos/sync", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("Notion"));
}

/// Tests that an unknown priority is rejected with a JSON error body
#[tokio::test]
async fn test_unknown_priority_is_rejected() {
    let mut app = create_test_app();
    let (status, body) = request(&mut app, "POST", "/todos", Some(json!({"title": "x", "priority": "urgent"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("urgent"));
}
