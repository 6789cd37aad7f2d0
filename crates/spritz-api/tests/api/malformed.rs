use axum::http::StatusCode;
use serde_json::Value;

use crate::testapp::TestApp;

fn error_message(content_type: &str, body: &str) -> String {
    assert!(content_type.starts_with("application/json"), "got {}", content_type);
    let json: Value = serde_json::from_str(body).expect("error body is not JSON");
    json["error"].as_str().expect("missing error field").to_string()
}

#[tokio::test]
async fn wrongly_typed_body_is_a_json_400() {
    let app = TestApp::spawn();

    let (status, content_type, body) = app.post_raw("/auth/login", r#"{"walletAddress": 5}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!error_message(&content_type, &body).is_empty());
}

#[tokio::test]
async fn unparseable_body_is_a_json_400() {
    let app = TestApp::spawn();

    let (status, content_type, body) = app.post_raw("/streams", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!error_message(&content_type, &body).is_empty());
}

#[tokio::test]
async fn bad_query_is_a_json_400() {
    let app = TestApp::spawn();

    let (status, content_type, body) = app.get_raw("/leaderboard?limit=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!error_message(&content_type, &body).is_empty());

    let (status, content_type, body) = app.get_raw("/calendar/slots?userAddress=0xa&date=2025-01-01&durationMinutes=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!error_message(&content_type, &body).is_empty());
}
