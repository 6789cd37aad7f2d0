use axum::{Json, extract::State};
use tracing::{debug, warn};

use spritz_db::queries::UserStat;
use spritz_types::api::{SuccessResponse, TrackEventRequest};
use spritz_types::models::{AnalyticsEvent, normalize_any};

use crate::error::{ApiError, ApiResult, required};
use crate::extract::ApiJson;
use crate::state::{AppState, with_db};

/// The counter an event feeds and how many units one event adds.
pub fn stat_for(event: AnalyticsEvent, duration_minutes: Option<i64>) -> (UserStat, i64) {
    let minutes = duration_minutes.filter(|m| *m > 0).unwrap_or(1);
    match event {
        AnalyticsEvent::MessageSent => (UserStat::MessagesSent, 1),
        AnalyticsEvent::FriendAdded => (UserStat::FriendsAdded, 1),
        AnalyticsEvent::FriendRequestSent => (UserStat::FriendRequestsSent, 1),
        AnalyticsEvent::VoiceCall => (UserStat::VoiceMinutes, minutes),
        AnalyticsEvent::VideoCall => (UserStat::VideoMinutes, minutes),
        AnalyticsEvent::GroupCreated => (UserStat::GroupsCreated, 1),
        AnalyticsEvent::StreamStarted => (UserStat::StreamsStarted, 1),
        AnalyticsEvent::RoomCreated => (UserStat::RoomsCreated, 1),
    }
}

/// Counting is best effort: once the input validates, store failures are
/// logged and the caller still gets `{"success": true}`.
pub async fn track(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TrackEventRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let address = normalize_any(&required(req.wallet_address, "Wallet address is required")?);
    let tag = required(req.event_type, "Event type is required")?;
    let event: AnalyticsEvent = tag
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Unknown event type: {}", tag)))?;

    let (stat, amount) = stat_for(event, req.duration_minutes);
    let who = address.clone();
    match with_db(&state, move |db| db.increment_user_stat(&who, stat, amount)).await {
        Ok(true) => debug!("Tracked {} for {}", tag, address),
        Ok(false) => debug!("Ignored {} for unknown user {}", tag, address),
        Err(e) => warn!("Failed to track {} for {}: {:#}", tag, address, e),
    }

    Ok(Json(SuccessResponse::ok()))
}
