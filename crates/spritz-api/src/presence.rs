use std::collections::{HashMap, HashSet};

use axum::{Json, extract::State};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use spritz_types::api::{HeartbeatRequest, PresenceResponse, SuccessResponse};
use spritz_types::models::{PresenceView, normalize_any};

use crate::error::{ApiError, ApiResult, required};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::{AppState, read_or_empty, with_db};

/// A wallet counts as online while its last heartbeat is younger than this.
pub const ONLINE_WINDOW_SECS: i64 = 120;
const MAX_ADDRESSES: usize = 200;

pub fn is_online(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last_seen.is_some_and(|seen| now - seen < Duration::seconds(ONLINE_WINDOW_SECS))
}

pub async fn heartbeat(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<HeartbeatRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let address = normalize_any(&required(req.user_address, "User address is required")?);
    let status = req.status.filter(|s| !s.trim().is_empty());

    with_db(&state, move |db| db.touch_presence(&address, status.as_deref())).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[derive(Debug, Deserialize)]
pub struct PresenceQuery {
    pub addresses: Option<String>,
}

/// Presence for a comma-separated address list, in request order with
/// duplicates dropped. Unknown addresses are reported offline.
pub async fn lookup(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PresenceQuery>,
) -> ApiResult<Json<PresenceResponse>> {
    let raw = required(query.addresses, "Addresses are required")?;
    let mut seen = HashSet::new();
    let addresses: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(normalize_any)
        .filter(|a| seen.insert(a.clone()))
        .collect();
    if addresses.len() > MAX_ADDRESSES {
        return Err(ApiError::bad_request(format!("At most {} addresses per lookup", MAX_ADDRESSES)));
    }

    let wanted = addresses.clone();
    let rows = read_or_empty(&state, "presence", move |db| db.presence_for(&wanted)).await?;

    let now = Utc::now();
    let mut found: HashMap<String, PresenceView> = rows
        .into_iter()
        .map(|row| {
            let online = is_online(Some(spritz_db::decode_ts(&row.last_seen)), now);
            (row.wallet_address.clone(), row.into_view(online))
        })
        .collect();

    let presence = addresses
        .into_iter()
        .map(|address| {
            found.remove(&address).unwrap_or(PresenceView {
                address,
                is_online: false,
                status: None,
                last_seen: None,
            })
        })
        .collect();

    Ok(Json(PresenceResponse { presence }))
}
