use axum::http::StatusCode;
use serde_json::json;

use crate::testapp::TestApp;

async fn start_stream(app: &TestApp) -> String {
    let (status, body) = app
        .post("/streams", json!({ "hostAddress": "0xStreamer", "title": "Late show" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["stream"]["status"], "live");
    body["stream"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn viewer_count_never_goes_below_zero() {
    let app = TestApp::spawn();
    let id = start_stream(&app).await;
    let viewers = format!("/streams/{}/viewers", id);

    let (status, body) = app.delete(&viewers).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["viewerCount"], 0);

    app.post(&viewers, json!({})).await;
    let (_, body) = app.post(&viewers, json!({})).await;
    assert_eq!(body["viewerCount"], 2);

    for _ in 0..4 {
        app.delete(&viewers).await;
    }
    let (_, body) = app.get(&format!("/streams/{}", id)).await;
    assert_eq!(body["stream"]["viewerCount"], 0);

    let (status, _) = app.delete("/streams/no-such-stream/viewers").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_messages_are_truncated_and_listed_in_order() {
    let app = TestApp::spawn();
    let id = start_stream(&app).await;
    let chat = format!("/streams/{}/chat", id);

    let long = "x".repeat(650);
    let (status, body) = app
        .post(&chat, json!({ "userAddress": "0xfan", "message": long }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"]["message"].as_str().unwrap().chars().count(), 500);

    app.post(&chat, json!({ "userAddress": "0xfan", "message": "second" })).await;
    app.post(&chat, json!({ "userAddress": "0xfan", "message": "third" })).await;

    let (_, body) = app.get(&format!("{}?limit=2", chat)).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["message"], "second");
    assert_eq!(messages[1]["message"], "third");
}

#[tokio::test]
async fn chat_input_and_stream_state_are_checked() {
    let app = TestApp::spawn();
    let id = start_stream(&app).await;
    let chat = format!("/streams/{}/chat", id);

    let (status, _) = app.post(&chat, json!({ "userAddress": "0xfan", "message": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/streams/missing/chat", json!({ "userAddress": "0xfan", "message": "hi" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(&format!("/streams/{}/end", id), json!({ "hostAddress": "0xfan" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(&format!("/streams/{}/end", id), json!({ "hostAddress": "0xstreamer" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stream"]["status"], "ended");

    let (status, _) = app.post(&chat, json!({ "userAddress": "0xfan", "message": "hi" })).await;
    assert_eq!(status, StatusCode::GONE);

    let viewers = format!("/streams/{}/viewers", id);
    let (status, _) = app.post(&viewers, json!({})).await;
    assert_eq!(status, StatusCode::GONE);
    let (_, body) = app.get(&format!("/streams/{}", id)).await;
    assert_eq!(body["stream"]["viewerCount"], 0);

    let (_, body) = app.get("/streams").await;
    assert_eq!(body["streams"], json!([]));
}

#[tokio::test]
async fn chat_history_survives_a_missing_table() {
    let app = TestApp::spawn();
    let id = start_stream(&app).await;
    app.db()
        .with_conn(|conn| {
            conn.execute_batch("DROP TABLE shout_stream_chat")?;
            Ok(())
        })
        .unwrap();

    let (status, body) = app.get(&format!("/streams/{}/chat", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"], json!([]));
}
