use axum::http::StatusCode;
use chrono::{Datelike, Duration, Utc};
use serde_json::json;

use crate::testapp::TestApp;

fn window(day: i64, start: &str, end: &str) -> serde_json::Value {
    json!({
        "userAddress": "0xplanner",
        "dayOfWeek": day,
        "startTime": start,
        "endTime": end,
        "timezone": "Europe/Berlin",
    })
}

#[tokio::test]
async fn window_ending_before_it_starts_is_rejected() {
    let app = TestApp::spawn();

    let (status, body) = app.post("/calendar/availability", window(1, "17:00", "09:00")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "endTime must be after startTime");

    let (status, _) = app.post("/calendar/availability", window(1, "09:00", "09:00")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/calendar/availability", window(9, "09:00", "10:00")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn windows_are_created_updated_and_soft_deleted() {
    let app = TestApp::spawn();

    let (status, created) = app.post("/calendar/availability", window(2, "9:00", "12:00")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["window"]["startTime"], "09:00");
    let id = created["window"]["id"].as_str().unwrap().to_string();

    app.post("/calendar/availability", window(1, "13:00", "14:00")).await;

    let (_, list) = app.get("/calendar/availability?userAddress=0xplanner").await;
    let windows = list["windows"].as_array().unwrap();
    assert_eq!(windows.len(), 2);
    assert_eq!(windows[0]["dayOfWeek"], 1);

    // Partial update keeps the stored start time and is validated as a whole.
    let (status, _) = app
        .put(
            &format!("/calendar/availability/{}", id),
            json!({ "userAddress": "0xplanner", "endTime": "08:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .put(
            &format!("/calendar/availability/{}", id),
            json!({ "userAddress": "0xplanner", "endTime": "10:30" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["window"]["startTime"], "09:00");
    assert_eq!(updated["window"]["endTime"], "10:30");

    // Someone else cannot touch it.
    let (status, _) = app
        .delete(&format!("/calendar/availability/{}?userAddress=0xother", id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .delete(&format!("/calendar/availability/{}?userAddress=0xplanner", id))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = app.get("/calendar/availability?userAddress=0xplanner").await;
    assert_eq!(list["windows"].as_array().unwrap().len(), 1);

    // Soft deleted rows are still there, flagged inactive.
    let row = app.db().get_availability(&id).unwrap().unwrap();
    assert!(!row.is_active);

    let (status, _) = app
        .delete(&format!("/calendar/availability/{}?userAddress=0xplanner", id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn slots_follow_the_weekday_windows() {
    let app = TestApp::spawn();
    let date = (Utc::now() + Duration::days(7)).date_naive();
    let day = date.weekday().num_days_from_sunday() as i64;

    app.post("/calendar/availability", window(day, "09:00", "11:00")).await;
    app.post("/calendar/availability", window((day + 1) % 7, "09:00", "17:00")).await;

    let (status, body) = app
        .get(&format!(
            "/calendar/slots?userAddress=0xplanner&date={}&durationMinutes=60",
            date.format("%Y-%m-%d")
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert!(slots[0]["start"].as_str().unwrap().contains("T09:00:00"));

    let (status, _) = app
        .get("/calendar/slots?userAddress=0xplanner&date=next-tuesday")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_tables_read_as_empty() {
    let app = TestApp::spawn();
    app.db()
        .with_conn(|conn| {
            conn.execute_batch(
                "DROP TABLE shout_availability_windows;
                 DROP TABLE shout_calendar_connections;",
            )?;
            Ok(())
        })
        .unwrap();

    let (status, body) = app.get("/calendar/availability?userAddress=0xplanner").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["windows"], json!([]));

    let (status, body) = app.get("/calendar/status?userAddress=0xplanner").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], false);

    // Writes are not downgraded.
    let (status, _) = app.post("/calendar/availability", window(1, "09:00", "10:00")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn connect_requires_google_configuration() {
    let app = TestApp::spawn();

    let (status, _) = app.get("/calendar/connect?userAddress=0xplanner").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = app.get("/calendar/connect").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn callback_failures_redirect_with_a_reason() {
    let app = TestApp::spawn();

    let (status, location) = app.redirect("/calendar/callback?error=access_denied").await;
    assert!(status.is_redirection());
    assert_eq!(
        location.as_deref(),
        Some("http://localhost:3000/?calendar=error&reason=access_denied")
    );

    let (_, location) = app.redirect("/calendar/callback?state=abc").await;
    assert!(location.unwrap().ends_with("reason=missing_code"));

    let (_, location) = app.redirect("/calendar/callback?code=xyz&state=forged").await;
    assert!(location.unwrap().ends_with("reason=invalid_state"));
}

#[tokio::test]
async fn status_hides_tokens() {
    let app = TestApp::spawn();
    app.db()
        .upsert_calendar_connection(
            "0xplanner",
            "google",
            &spritz_db::models::CalendarTokens {
                access_token: "secret-access".into(),
                refresh_token: Some("secret-refresh".into()),
                token_expires_at: None,
                calendar_id: Some("planner@example.com".into()),
                calendar_email: Some("planner@example.com".into()),
            },
        )
        .unwrap();

    let (status, body) = app.get("/calendar/status?userAddress=0xplanner").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], true);
    assert_eq!(body["connection"]["calendarEmail"], "planner@example.com");
    assert!(!body.to_string().contains("secret"));

    let (status, _) = app
        .post("/calendar/disconnect", json!({ "userAddress": "0xplanner" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/calendar/status?userAddress=0xplanner").await;
    assert_eq!(body["connected"], false);
}
