use axum::http::StatusCode;
use serde_json::json;

use spritz_db::queries::UserStat;

use crate::testapp::TestApp;

#[tokio::test]
async fn tracked_events_feed_counters_and_points() {
    let app = TestApp::spawn();
    app.login("0xtalker").await;

    for _ in 0..3 {
        let (status, body) = app
            .post(
                "/analytics/track",
                json!({ "walletAddress": "0xTALKER", "eventType": "message_sent" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
    app.post(
        "/analytics/track",
        json!({ "walletAddress": "0xtalker", "eventType": "voice_call", "durationMinutes": 7 }),
    )
    .await;

    let db = app.db();
    assert_eq!(db.user_stat("0xtalker", UserStat::MessagesSent).unwrap(), Some(3));
    assert_eq!(db.user_stat("0xtalker", UserStat::VoiceMinutes).unwrap(), Some(7));
    assert_eq!(db.get_user("0xtalker").unwrap().unwrap().points, 10);
}

#[tokio::test]
async fn unknown_event_is_rejected() {
    let app = TestApp::spawn();

    let (status, body) = app
        .post(
            "/analytics/track",
            json!({ "walletAddress": "0xa", "eventType": "teleported" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("teleported"));

    let (status, _) = app.post("/analytics/track", json!({ "eventType": "message_sent" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_failures_are_swallowed() {
    let app = TestApp::spawn();

    // Unknown wallet: nothing to count, still a success.
    let (status, body) = app
        .post(
            "/analytics/track",
            json!({ "walletAddress": "0xghost", "eventType": "room_created" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    app.db()
        .with_conn(|conn| Ok(conn.execute_batch("DROP TABLE shout_users")?))
        .ok();
    let (status, body) = app
        .post(
            "/analytics/track",
            json!({ "walletAddress": "0xghost", "eventType": "room_created" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn leaderboard_orders_by_points_and_reports_rank() {
    let app = TestApp::spawn();
    for addr in ["0x01", "0x02", "0x03"] {
        app.login(addr).await;
    }
    let db = app.db();
    db.increment_user_stat("0x02", UserStat::GroupsCreated, 2).unwrap();
    db.increment_user_stat("0x03", UserStat::MessagesSent, 5).unwrap();

    let (status, body) = app.get("/leaderboard?limit=2&userAddress=0x01").await;
    assert_eq!(status, StatusCode::OK);
    let board = body["leaderboard"].as_array().unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0]["walletAddress"], "0x02");
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[1]["walletAddress"], "0x03");
    assert_eq!(body["userRank"], 3);

    let (_, body) = app.get("/leaderboard?limit=0").await;
    assert_eq!(body["leaderboard"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn leaderboard_without_users_table_is_empty() {
    let app = TestApp::spawn();
    app.login("0x01").await;
    app.db()
        .with_conn(|conn| {
            conn.execute_batch("DROP TABLE shout_users")?;
            Ok(())
        })
        .unwrap();

    let (status, body) = app.get("/leaderboard?userAddress=0x01").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["leaderboard"].as_array().unwrap().is_empty());
    assert!(body["userRank"].is_null());
}
