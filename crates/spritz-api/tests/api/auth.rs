use axum::http::{Method, StatusCode};
use ed25519_dalek::{Signer, SigningKey};
use serde_json::json;

use crate::testapp::TestApp;

#[tokio::test]
async fn login_without_wallet_address_is_rejected() {
    let app = TestApp::spawn();

    let (status, body) = app.post("/auth/login", json!({ "chain": "base" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Wallet address is required");

    let (status, _) = app.post("/auth/login", json!({ "walletAddress": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_login_increments_login_count() {
    let app = TestApp::spawn();

    let first = app.login("0xAbC123").await;
    assert_eq!(first["isNewUser"], true);
    assert_eq!(first["user"]["loginCount"], 1);
    assert_eq!(first["user"]["walletAddress"], "0xabc123");

    // Same EVM wallet in a different case is the same user.
    let second = app.login("0xabc123").await;
    assert_eq!(second["isNewUser"], false);
    assert_eq!(second["user"]["loginCount"], 2);

    let third = app.login("0xABC123").await;
    assert_eq!(third["user"]["loginCount"], 3);
}

#[tokio::test]
async fn solana_addresses_keep_their_case() {
    let app = TestApp::spawn();
    let body = app.login("So1anaWa11etAddre55").await;
    assert_eq!(body["user"]["walletAddress"], "So1anaWa11etAddre55");
    assert_eq!(body["user"]["walletType"], "solana");
}

#[tokio::test]
async fn banned_wallet_cannot_log_in() {
    let app = TestApp::spawn();
    app.login("0xbad").await;
    app.db().set_banned("0xbad", Some("spam")).unwrap();

    let (status, body) = app.post("/auth/login", json!({ "walletAddress": "0xbad" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["banned"], true);
    assert_eq!(body["reason"], "spam");

    let user = app.db().get_user("0xbad").unwrap().unwrap();
    assert_eq!(user.login_count, 1);
}

#[tokio::test]
async fn user_invite_is_redeemed_on_first_login() {
    let app = TestApp::spawn();
    app.login("0xowner").await;

    let (_, invites) = app.get("/invites?userAddress=0xowner").await;
    assert_eq!(invites["available"], 5);
    let code = invites["invites"][0]["code"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/auth/login",
            json!({ "walletAddress": "0xnewbie", "inviteCode": code.to_lowercase() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inviteRedeemed"], true);
    assert_eq!(body["user"]["referredBy"], "0xowner");

    let owner = app.db().get_user("0xowner").unwrap().unwrap();
    assert_eq!(owner.points, 100);

    let (_, invites) = app.get("/invites?userAddress=0xowner").await;
    assert_eq!(invites["used"], 1);
    assert_eq!(invites["available"], 4);

    // Spent codes do not work twice.
    let again = app
        .post("/auth/login", json!({ "walletAddress": "0xlate", "inviteCode": code }))
        .await
        .1;
    assert_eq!(again["inviteRedeemed"], false);
}

#[tokio::test]
async fn admin_invite_respects_max_uses() {
    let app = TestApp::spawn();
    app.db().create_admin_invite("LAUNCH42", Some(1), None, Some("launch")).unwrap();

    let (_, check) = app.get("/invites/launch42").await;
    assert_eq!(check["valid"], true);
    assert_eq!(check["kind"], "admin");

    let first = app
        .post("/auth/login", json!({ "walletAddress": "0x01", "inviteCode": "LAUNCH42" }))
        .await
        .1;
    assert_eq!(first["inviteRedeemed"], true);

    let second = app
        .post("/auth/login", json!({ "walletAddress": "0x02", "inviteCode": "LAUNCH42" }))
        .await
        .1;
    assert_eq!(second["inviteRedeemed"], false);
    assert_eq!(second["isNewUser"], true);

    let (_, check) = app.get("/invites/LAUNCH42").await;
    assert_eq!(check["valid"], false);
}

#[tokio::test]
async fn lowercase_admin_invite_is_redeemable() {
    let app = TestApp::spawn();
    app.db().create_admin_invite("launch", Some(10), None, None).unwrap();

    let (_, check) = app.get("/invites/Launch").await;
    assert_eq!(check["valid"], true);

    let (status, body) = app
        .post("/auth/login", json!({ "walletAddress": "0xnew1", "inviteCode": "launch" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inviteRedeemed"], true);
    assert_eq!(app.db().find_admin_invite("LAUNCH").unwrap().unwrap().current_uses, 1);
}

#[tokio::test]
async fn admin_invite_works_without_user_invite_table() {
    let app = TestApp::spawn();
    app.db().create_admin_invite("LAUNCH", Some(10), None, None).unwrap();
    app.db()
        .with_conn(|conn| {
            conn.execute_batch("DROP TABLE shout_user_invites")?;
            Ok(())
        })
        .unwrap();

    let (status, body) = app
        .post("/auth/login", json!({ "walletAddress": "0xnew2", "inviteCode": "LAUNCH" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inviteRedeemed"], true);
    assert_eq!(app.db().find_admin_invite("LAUNCH").unwrap().unwrap().current_uses, 1);
}

#[tokio::test]
async fn invite_redemption_only_applies_to_new_users() {
    let app = TestApp::spawn();
    app.db().create_admin_invite("OLDUSER1", None, None, None).unwrap();
    app.login("0xexisting").await;

    let body = app
        .post("/auth/login", json!({ "walletAddress": "0xexisting", "inviteCode": "OLDUSER1" }))
        .await
        .1;
    assert_eq!(body["inviteRedeemed"], false);
}

#[tokio::test]
async fn solana_sign_in_issues_a_session() {
    let app = TestApp::spawn();
    let key = SigningKey::from_bytes(&[9u8; 32]);
    let address = bs58::encode(key.verifying_key().as_bytes()).into_string();

    let (status, nonce) = app.get(&format!("/auth/solana/nonce?address={}", address)).await;
    assert_eq!(status, StatusCode::OK);
    let message = nonce["message"].as_str().unwrap().to_string();
    assert!(message.contains(nonce["nonce"].as_str().unwrap()));

    let signature = bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string();
    let verify = json!({ "address": address, "message": message, "signature": signature });

    let (status, body) = app.post("/auth/solana/verify", verify.clone()).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["walletType"], "solana");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, session) = app
        .request(Method::GET, "/auth/session", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["walletAddress"], address);

    // The nonce is single use.
    let (status, _) = app.post("/auth/solana/verify", verify).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_solana_signature_is_rejected() {
    let app = TestApp::spawn();
    let key = SigningKey::from_bytes(&[9u8; 32]);
    let impostor = SigningKey::from_bytes(&[10u8; 32]);
    let address = bs58::encode(key.verifying_key().as_bytes()).into_string();

    let (_, nonce) = app.get(&format!("/auth/solana/nonce?address={}", address)).await;
    let message = nonce["message"].as_str().unwrap().to_string();
    let signature = bs58::encode(impostor.sign(message.as_bytes()).to_bytes()).into_string();

    let (status, _) = app
        .post(
            "/auth/solana/verify",
            json!({ "address": address, "message": message, "signature": signature }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_requires_a_valid_token() {
    let app = TestApp::spawn();

    let (status, _) = app.get("/auth/session").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/auth/session", None, Some("not-a-jwt"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
