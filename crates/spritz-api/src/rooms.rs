use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use spritz_crypto::codes;
use spritz_db::models::InstantRoomRow;
use spritz_db::{decode_ts, encode_ts, now_ts};
use spritz_types::api::{
    CreateInstantRoomRequest, InstantRoomResponse, JoinRoomRequest, RoomTokenRequest,
    RoomTokenResponse, SuccessResponse,
};
use spritz_types::models::normalize_any;

use crate::error::{ApiError, ApiResult, required};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::{AppState, Huddle01Config, with_db};
use crate::video;

pub const DEFAULT_ROOM_MINUTES: i64 = 60;
pub const MAX_ROOM_MINUTES: i64 = 24 * 60;
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 20;
pub const MAX_PARTICIPANTS_CAP: u32 = 100;

/// Attempts at drawing an unused join code before giving up.
const JOIN_CODE_ATTEMPTS: usize = 5;

fn provider(state: &AppState) -> ApiResult<&Huddle01Config> {
    state
        .config
        .huddle01
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Video calling is not configured".into()))
}

pub async fn token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RoomTokenRequest>,
) -> ApiResult<Json<RoomTokenResponse>> {
    let room_id = required(req.room_id, "Room ID is required")?;
    let cfg = provider(&state)?;

    let token = video::mint_token(
        cfg,
        &room_id,
        req.display_name.as_deref(),
        req.user_address.as_deref(),
        Duration::hours(video::TOKEN_TTL_HOURS),
    )?;

    Ok(Json(RoomTokenResponse { token, room_id }))
}

// -- Instant rooms --

pub async fn create_instant(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateInstantRoomRequest>,
) -> ApiResult<impl IntoResponse> {
    let host = normalize_any(&required(req.host_address, "Host address is required")?);
    let cfg = provider(&state)?;

    let minutes = req
        .duration_minutes
        .unwrap_or(DEFAULT_ROOM_MINUTES)
        .clamp(1, MAX_ROOM_MINUTES);
    let max_participants = req
        .max_participants
        .unwrap_or(DEFAULT_MAX_PARTICIPANTS)
        .clamp(2, MAX_PARTICIPANTS_CAP);
    let title = req.title.filter(|t| !t.trim().is_empty());

    let room_id = video::create_room(
        &state.http,
        cfg,
        title.as_deref().unwrap_or("Instant Room"),
        &host,
    )
    .await
    .map_err(|e| {
        warn!("Room provisioning failed for {}: {:#}", host, e);
        ApiError::Upstream("Failed to create room".into())
    })?;

    let expires_at = encode_ts(Utc::now() + Duration::minutes(minutes));
    let row = with_db(&state, move |db| {
        for _ in 0..JOIN_CODE_ATTEMPTS {
            let code = codes::join_code();
            if db.join_code_taken(&code)? {
                continue;
            }
            return db.create_instant_room(
                &room_id,
                &code,
                &host,
                title.as_deref(),
                max_participants,
                &expires_at,
            );
        }
        anyhow::bail!("No free join code after {} attempts", JOIN_CODE_ATTEMPTS)
    })
    .await?;

    info!("Instant room {} opened by {}", row.join_code, row.host_address);
    Ok((StatusCode::CREATED, Json(InstantRoomResponse { room: row.into_view() })))
}

/// Look a room up by join code: 404 when unknown, 410 when ended or expired.
async fn live_room(state: &AppState, code: &str) -> ApiResult<InstantRoomRow> {
    let code = codes::normalize_code(code);
    let row = with_db(state, move |db| db.get_instant_room(&code))
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    if row.is_gone(&now_ts()) {
        return Err(ApiError::Gone("Room has ended or expired".into()));
    }
    Ok(row)
}

pub async fn get_instant(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<InstantRoomResponse>> {
    let row = live_room(&state, &code).await?;
    Ok(Json(InstantRoomResponse { room: row.into_view() }))
}

/// Token for a participant of an instant room. It never outlives the room.
pub async fn instant_token(
    State(state): State<AppState>,
    Path(code): Path<String>,
    ApiJson(req): ApiJson<JoinRoomRequest>,
) -> ApiResult<Json<RoomTokenResponse>> {
    let row = live_room(&state, &code).await?;
    let cfg = provider(&state)?;

    let ttl = decode_ts(&row.expires_at) - Utc::now();
    let token = video::mint_token(
        cfg,
        &row.room_id,
        req.display_name.as_deref(),
        req.user_address.as_deref(),
        ttl,
    )?;

    Ok(Json(RoomTokenResponse {
        token,
        room_id: row.room_id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostQuery {
    pub host_address: Option<String>,
}

pub async fn end_instant(
    State(state): State<AppState>,
    Path(code): Path<String>,
    ApiQuery(query): ApiQuery<HostQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let host = normalize_any(&required(query.host_address, "Host address is required")?);
    let code = codes::normalize_code(&code);

    let lookup = code.clone();
    let row = with_db(&state, move |db| db.get_instant_room(&lookup))
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;
    if row.host_address != host {
        return Err(ApiError::Forbidden("Only the host can end this room".into()));
    }

    with_db(&state, move |db| db.end_instant_room(&code)).await?;
    info!("Instant room {} ended by host", row.join_code);
    Ok(Json(SuccessResponse::ok()))
}
