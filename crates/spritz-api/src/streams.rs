use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{debug, info};

use spritz_db::models::{StreamChatRow, StreamRow};
use spritz_types::api::{
    ChatListResponse, ChatMessageResponse, CreateStreamRequest, HostBody, SendChatRequest,
    StreamListResponse, StreamResponse, ViewerCountResponse,
};
use spritz_types::models::normalize_any;

use crate::error::{ApiError, ApiResult, required};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::{AppState, read_or_empty, with_db};

/// Longer chat messages are cut to this many characters.
pub const MAX_CHAT_CHARS: usize = 500;
const DEFAULT_CHAT_LIMIT: u32 = 50;
const MAX_CHAT_LIMIT: u32 = 200;

pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

async fn find_stream(state: &AppState, id: &str) -> ApiResult<StreamRow> {
    let id = id.to_string();
    with_db(state, move |db| db.get_stream(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Stream not found"))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateStreamRequest>,
) -> ApiResult<impl IntoResponse> {
    let host = normalize_any(&required(req.host_address, "Host address is required")?);
    let title = req.title.filter(|t| !t.trim().is_empty());

    let row = with_db(&state, move |db| db.create_stream(&host, title.as_deref())).await?;
    info!("Stream {} started by {}", row.id, row.host_address);

    Ok((StatusCode::CREATED, Json(StreamResponse { stream: row.into_view() })))
}

pub async fn list_live(State(state): State<AppState>) -> ApiResult<Json<StreamListResponse>> {
    let rows = read_or_empty(&state, "streams", |db| db.live_streams()).await?;
    Ok(Json(StreamListResponse {
        streams: rows.into_iter().map(StreamRow::into_view).collect(),
    }))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<StreamResponse>> {
    let row = find_stream(&state, &id).await?;
    Ok(Json(StreamResponse { stream: row.into_view() }))
}

pub async fn end(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<HostBody>,
) -> ApiResult<Json<StreamResponse>> {
    let host = normalize_any(&required(req.host_address, "Host address is required")?);
    let row = find_stream(&state, &id).await?;
    if row.host_address != host {
        return Err(ApiError::Forbidden("Only the host can end this stream".into()));
    }

    let target = id.clone();
    with_db(&state, move |db| db.end_stream(&target)).await?;
    info!("Stream {} ended", id);

    let row = find_stream(&state, &id).await?;
    Ok(Json(StreamResponse { stream: row.into_view() }))
}

// -- Chat --

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub limit: Option<u32>,
}

pub async fn chat_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<ChatQuery>,
) -> ApiResult<Json<ChatListResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_CHAT_LIMIT).clamp(1, MAX_CHAT_LIMIT);

    let rows = read_or_empty(&state, "stream_chat", move |db| db.recent_stream_chat(&id, limit)).await?;
    Ok(Json(ChatListResponse {
        messages: rows.into_iter().map(StreamChatRow::into_view).collect(),
    }))
}

pub async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SendChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let sender = normalize_any(&required(req.user_address, "User address is required")?);
    let message = required(req.message, "Message is required")?;

    let stream = find_stream(&state, &id).await?;
    if !stream.is_live() {
        return Err(ApiError::Gone("Stream has ended".into()));
    }

    let message = truncate_chars(&message, MAX_CHAT_CHARS);
    let row = with_db(&state, move |db| db.insert_stream_chat(&id, &sender, &message)).await?;
    debug!("Chat message {} on stream {}", row.id, row.stream_id);

    Ok((StatusCode::CREATED, Json(ChatMessageResponse { message: row.into_view() })))
}

// -- Viewers --

pub async fn join(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ViewerCountResponse>> {
    let lookup = id.clone();
    match with_db(&state, move |db| db.increment_viewers(&lookup)).await? {
        Some(viewer_count) => Ok(Json(ViewerCountResponse { viewer_count })),
        None => {
            // Not counted: either unknown (404) or no longer live (410).
            find_stream(&state, &id).await?;
            Err(ApiError::Gone("Stream has ended".into()))
        }
    }
}

pub async fn leave(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ViewerCountResponse>> {
    let viewer_count = with_db(&state, move |db| db.decrement_viewers(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Stream not found"))?;
    Ok(Json(ViewerCountResponse { viewer_count }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 500), "short");
        assert_eq!(truncate_chars(&"🍹".repeat(600), MAX_CHAT_CHARS).chars().count(), 500);
    }
}
