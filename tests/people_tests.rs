/// Integration tests for people and birthdays

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

/// Tests that birthday-derived fields come back with each person
///
/// This test verifies:
/// 1. January 15 maps to Capricorn
/// 2. A person without a birthday has no zodiac or age
/// 3. The list is ordered by name
#[tokio::test]
async fn test_people_carry_birthday_details() {
    let mut app = create_test_app();

    let (status, maya) =
        request(&mut app, "POST", "/people", Some(json!({"name": "Maya", "birthday": "1985-01-15"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(maya["zodiac"], "capricorn");
    assert!(maya["next_birthday"].is_string());

    let (status, ben) = request(&mut app, "POST", "/people", Some(json!({"name": "Ben"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ben["zodiac"], serde_json::Value::Null);
    assert_eq!(ben["age"], serde_json::Value::Null);

    let (_, people) = request(&mut app, "GET", "/people", None).await;
    let names: Vec<&str> = people.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Ben", "Maya"]);
}

/// Tests the upcoming birthdays window
#[tokio::test]
async fn test_upcoming_birthdays_window() {
    let mut app = create_test_app();
    request(&mut app, "POST", "/people", Some(json!({"name": "Maya", "birthday": "1985-01-15"}))).await;
    request(&mut app, "POST", "/people", Some(json!({"name": "Ben"}))).await;

    // Every birthday falls within a year
    let (status, upcoming) = request(&mut app, "GET", "/people/birthdays?days=366", None).await;
    assert_eq!(status, StatusCode::OK);
    let upcoming = upcoming.as_array().unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0]["name"], "Maya");
    assert_eq!(upcoming[0]["zodiac"], "capricorn");
    assert!(upcoming[0]["days_until"].as_i64().unwrap() <= 366);

    let (status, _) = request(&mut app, "GET", "/people/birthdays?days=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Tests that a blank name is rejected and unknown people are 404
#[tokio::test]
async fn test_people_errors() {
    let mut app = create_test_app();

    let (status, body) = request(&mut app, "POST", "/people", Some(json!({"name": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "name must not be empty");

    let (status, _) = request(&mut app, "GET", "/people/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
