use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde_json::{Value, json};

use spritz_db::encode_ts;

use crate::testapp::{TestApp, VIDEO_KEY};

fn open_room(app: &TestApp, code: &str, expires_in: Duration) {
    app.db()
        .create_instant_room(
            &format!("room-{}", code),
            code,
            "0xhost",
            Some("Standup"),
            10,
            &encode_ts(Utc::now() + expires_in),
        )
        .unwrap();
}

fn claims(token: &str) -> Value {
    decode::<Value>(
        token,
        &DecodingKey::from_secret(VIDEO_KEY.as_bytes()),
        &Validation::default(),
    )
    .unwrap()
    .claims
}

#[tokio::test]
async fn every_participant_gets_host_permissions() {
    let app = TestApp::spawn();

    let (status, body) = app
        .post("/rooms/token", json!({ "roomId": "abc-defg-hij", "displayName": "Guest 7" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roomId"], "abc-defg-hij");

    let claims = claims(body["token"].as_str().unwrap());
    assert_eq!(claims["role"], "host");
    assert_eq!(claims["permissions"]["admin"], true);
    assert_eq!(claims["permissions"]["canProduceSources"]["screen"], true);

    let (status, _) = app.post("/rooms/token", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_instant_room_token_is_gone() {
    let app = TestApp::spawn();
    open_room(&app, "EXPIRED1", Duration::minutes(-1));

    let (status, _) = app.post("/rooms/instant/EXPIRED1/token", json!({})).await;
    assert_eq!(status, StatusCode::GONE);

    let (status, _) = app.get("/rooms/instant/EXPIRED1").await;
    assert_eq!(status, StatusCode::GONE);

    let (status, _) = app.post("/rooms/instant/NOSUCHRM/token", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn live_instant_room_issues_tokens_until_the_host_ends_it() {
    let app = TestApp::spawn();
    open_room(&app, "LIVEROOM", Duration::minutes(30));

    let (status, body) = app.get("/rooms/instant/liveroom").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room"]["joinCode"], "LIVEROOM");

    let (status, body) = app
        .post("/rooms/instant/LIVEROOM/token", json!({ "displayName": "Ada" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roomId"], "room-LIVEROOM");
    let claims = claims(body["token"].as_str().unwrap());
    assert!(claims["exp"].as_i64().unwrap() <= (Utc::now() + Duration::minutes(31)).timestamp());

    let (status, _) = app.delete("/rooms/instant/LIVEROOM?hostAddress=0xguest").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete("/rooms/instant/LIVEROOM?hostAddress=0xHOST").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/rooms/instant/LIVEROOM/token", json!({})).await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn instant_room_creation_needs_a_host() {
    let app = TestApp::spawn();
    let (status, _) = app.post("/rooms/instant", json!({ "title": "No host" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
