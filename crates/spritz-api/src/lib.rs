pub mod analytics;
pub mod auth;
pub mod availability;
pub mod calendar;
pub mod error;
pub mod extract;
pub mod friends;
pub mod google;
pub mod groups;
pub mod invites;
pub mod leaderboard;
pub mod middleware;
pub mod presence;
pub mod push;
pub mod rooms;
pub mod scheduling;
pub mod state;
pub mod streams;
pub mod video;

use axum::{
    Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

pub use state::{ApiConfig, AppState, AppStateInner, GoogleConfig, Huddle01Config};

/// Every route, relative to the `/api` prefix the server mounts it under.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/solana/nonce", get(auth::siws_nonce))
        .route("/auth/solana/verify", post(auth::siws_verify))
        // Analytics
        .route("/analytics/track", post(analytics::track))
        // Calendar
        .route("/calendar/connect", get(calendar::connect))
        .route("/calendar/callback", get(calendar::callback))
        .route("/calendar/status", get(calendar::status))
        .route("/calendar/disconnect", post(calendar::disconnect))
        .route("/calendar/availability", get(availability::list).post(availability::create))
        .route(
            "/calendar/availability/{id}",
            put(availability::update).delete(availability::remove),
        )
        .route("/calendar/slots", get(availability::slots))
        // Leaderboard
        .route("/leaderboard", get(leaderboard::leaderboard))
        // Rooms
        .route("/rooms/token", post(rooms::token))
        .route("/rooms/instant", post(rooms::create_instant))
        .route(
            "/rooms/instant/{code}",
            get(rooms::get_instant).delete(rooms::end_instant),
        )
        .route("/rooms/instant/{code}/token", post(rooms::instant_token))
        // Streams
        .route("/streams", get(streams::list_live).post(streams::create))
        .route("/streams/{id}", get(streams::get))
        .route("/streams/{id}/end", post(streams::end))
        .route(
            "/streams/{id}/chat",
            get(streams::chat_history).post(streams::send_chat),
        )
        .route(
            "/streams/{id}/viewers",
            post(streams::join).delete(streams::leave),
        )
        // Friends
        .route("/friends", get(friends::list))
        .route(
            "/friends/requests",
            get(friends::requests).post(friends::send_request),
        )
        .route("/friends/requests/{id}", delete(friends::cancel))
        .route("/friends/requests/{id}/accept", post(friends::accept))
        .route("/friends/requests/{id}/reject", post(friends::reject))
        .route("/friends/{address}", delete(friends::remove))
        // Groups
        .route("/groups", get(groups::list).post(groups::create))
        .route("/groups/invitations", get(groups::invitations))
        .route("/groups/invitations/{id}/accept", post(groups::accept))
        .route("/groups/invitations/{id}/decline", post(groups::decline))
        // Invites
        .route("/invites", get(invites::list))
        .route("/invites/{code}", get(invites::check))
        // Presence
        .route("/presence", get(presence::lookup))
        .route("/presence/heartbeat", post(presence::heartbeat))
        // Push
        .route("/push/subscribe", post(push::subscribe))
        .route("/push/unsubscribe", post(push::unsubscribe))
        .route("/push/status", get(push::status));

    let protected = Router::new()
        .route("/auth/session", get(auth::session))
        .layer(from_fn_with_state(state.clone(), middleware::require_session));

    public.merge(protected).with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let db = state::with_db(&state, |db| Ok(db.ping())).await.unwrap_or(false);
    Json(json!({
        "status": if db { "ok" } else { "degraded" },
        "database": db,
    }))
}
