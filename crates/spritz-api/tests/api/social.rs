use axum::http::StatusCode;
use serde_json::json;

use crate::testapp::TestApp;

// 32 zero bytes, standard base64.
const GROUP_KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

#[tokio::test]
async fn friend_requests_flow() {
    let app = TestApp::spawn();

    let (status, _) = app
        .post("/friends/requests", json!({ "fromAddress": "0xAlice", "toAddress": "0xalice" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post("/friends/requests", json!({ "fromAddress": "0xAlice", "toAddress": "0xBob" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["request"]["status"], "pending");
    let id = body["request"]["id"].as_str().unwrap().to_string();

    // Either direction counts as already pending.
    let (status, _) = app
        .post("/friends/requests", json!({ "fromAddress": "0xbob", "toAddress": "0xalice" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get("/friends/requests?userAddress=0xbob").await;
    assert_eq!(body["incoming"].as_array().unwrap().len(), 1);
    assert_eq!(body["outgoing"], json!([]));

    let accept = format!("/friends/requests/{}/accept", id);
    let (status, _) = app.post(&accept, json!({ "userAddress": "0xalice" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post(&accept, json!({ "userAddress": "0xBOB" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post(&accept, json!({ "userAddress": "0xbob" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get("/friends?userAddress=0xalice").await;
    let friends = body["friends"].as_array().unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0]["address"], "0xbob");
    assert_eq!(friends[0]["isOnline"], false);

    let (status, _) = app
        .post("/friends/requests", json!({ "fromAddress": "0xalice", "toAddress": "0xbob" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.delete("/friends/0xbob?userAddress=0xalice").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete("/friends/0xbob?userAddress=0xalice").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_sender_cancels_a_request() {
    let app = TestApp::spawn();
    let (_, body) = app
        .post("/friends/requests", json!({ "fromAddress": "0xcarol", "toAddress": "0xdave" }))
        .await;
    let id = body["request"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .delete(&format!("/friends/requests/{}?userAddress=0xdave", id))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&format!("/friends/requests/{}?userAddress=0xcarol", id))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/friends/requests?userAddress=0xdave").await;
    assert_eq!(body["incoming"], json!([]));
}

#[tokio::test]
async fn group_invitations_carry_the_key() {
    let app = TestApp::spawn();

    let (status, _) = app
        .post(
            "/groups",
            json!({ "creatorAddress": "0xowner", "name": "Crew", "groupKey": "not-a-key" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/groups",
            json!({
                "creatorAddress": "0xOwner",
                "name": "Crew",
                "groupKey": GROUP_KEY,
                "memberAddresses": ["0xMate", "0xmate", "0xowner"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["invitationsSent"], 1);
    let group_id = body["groupId"].as_str().unwrap().to_string();

    let (_, body) = app.get("/groups/invitations?userAddress=0xmate").await;
    let invitations = body["invitations"].as_array().unwrap();
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0]["groupName"], "Crew");
    let invitation = invitations[0]["id"].as_str().unwrap().to_string();

    let accept = format!("/groups/invitations/{}/accept", invitation);
    let (status, _) = app.post(&accept, json!({ "userAddress": "0xstranger" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&accept, json!({ "userAddress": "0xmate" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["groupId"], group_id);
    assert_eq!(body["groupKey"], GROUP_KEY);

    let (status, _) = app
        .post(
            &format!("/groups/invitations/{}/decline", invitation),
            json!({ "userAddress": "0xmate" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get("/groups?userAddress=0xmate").await;
    let groups = body["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["role"], "member");
    assert_eq!(groups[0]["memberCount"], 2);

    let (_, body) = app.get("/groups?userAddress=0xowner").await;
    assert_eq!(body["groups"][0]["role"], "admin");
}

#[tokio::test]
async fn presence_goes_stale_without_heartbeats() {
    let app = TestApp::spawn();

    let (status, _) = app
        .post("/presence/heartbeat", json!({ "userAddress": "0xAwake", "status": "coding" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/presence?addresses=0xawake,0xnobody,0xAWAKE").await;
    assert_eq!(status, StatusCode::OK);
    let presence = body["presence"].as_array().unwrap();
    assert_eq!(presence.len(), 2);
    assert_eq!(presence[0]["address"], "0xawake");
    assert_eq!(presence[0]["isOnline"], true);
    assert_eq!(presence[0]["status"], "coding");
    assert_eq!(presence[1]["address"], "0xnobody");
    assert_eq!(presence[1]["isOnline"], false);

    app.db()
        .with_conn(|conn| {
            conn.execute(
                "UPDATE shout_presence SET last_seen = ?1",
                [spritz_db::encode_ts(chrono::Utc::now() - chrono::Duration::minutes(5))],
            )?;
            Ok(())
        })
        .unwrap();
    let (_, body) = app.get("/presence?addresses=0xawake").await;
    assert_eq!(body["presence"][0]["isOnline"], false);

    let (status, _) = app.get("/presence").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn push_subscriptions_round_trip() {
    let app = TestApp::spawn();
    let subscription = json!({
        "userAddress": "0xpushy",
        "endpoint": "https://push.example.com/abc",
        "keys": { "p256dh": "BNc...", "auth": "tBH..." },
    });

    let (status, _) = app
        .post(
            "/push/subscribe",
            json!({ "userAddress": "0xpushy", "endpoint": "http://insecure", "keys": { "p256dh": "a", "auth": "b" } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/push/subscribe", subscription.clone()).await;
    assert_eq!(status, StatusCode::OK);
    // Re-subscribing the same endpoint is an upsert.
    app.post("/push/subscribe", subscription).await;

    let (_, body) = app.get("/push/status?userAddress=0xpushy").await;
    assert_eq!(body["subscribed"], true);

    app.post(
        "/push/unsubscribe",
        json!({ "userAddress": "0xpushy", "endpoint": "https://push.example.com/abc" }),
    )
    .await;
    let (_, body) = app.get("/push/status?userAddress=0xpushy").await;
    assert_eq!(body["subscribed"], false);
}

#[tokio::test]
async fn presence_without_table_reads_offline() {
    let app = TestApp::spawn();
    app.post("/presence/heartbeat", json!({ "userAddress": "0xa" })).await;
    app.db()
        .with_conn(|conn| {
            conn.execute_batch("DROP TABLE shout_presence")?;
            Ok(())
        })
        .unwrap();

    let (status, body) = app.get("/presence?addresses=0xa,0xb").await;
    assert_eq!(status, StatusCode::OK);
    let presence = body["presence"].as_array().unwrap();
    assert_eq!(presence.len(), 2);
    assert_eq!(presence[0]["address"], "0xa");
    assert_eq!(presence[0]["isOnline"], false);
    assert_eq!(presence[1]["isOnline"], false);
}

#[tokio::test]
async fn invitations_without_table_are_empty() {
    let app = TestApp::spawn();
    app.db()
        .with_conn(|conn| {
            conn.execute_batch("DROP TABLE shout_group_invitations")?;
            Ok(())
        })
        .unwrap();

    let (status, body) = app.get("/groups/invitations?userAddress=0xmate").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["invitations"].as_array().unwrap().is_empty());
}
