use axum::{Json, extract::State};
use tracing::debug;

use spritz_types::api::{PushStatusResponse, PushSubscribeRequest, PushUnsubscribeRequest, SuccessResponse};
use spritz_types::models::normalize_any;

use crate::calendar::AddressQuery;
use crate::error::{ApiError, ApiResult, required};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::{AppState, with_db};

pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PushSubscribeRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let address = normalize_any(&required(req.user_address, "User address is required")?);
    let endpoint = required(req.endpoint, "Endpoint is required")?;
    let keys = req
        .keys
        .filter(|k| !k.p256dh.is_empty() && !k.auth.is_empty())
        .ok_or_else(|| ApiError::bad_request("Subscription keys are required"))?;
    if !endpoint.starts_with("https://") {
        return Err(ApiError::bad_request("Endpoint must be an https URL"));
    }

    with_db(&state, move |db| {
        db.upsert_push_subscription(&address, &endpoint, &keys.p256dh, &keys.auth)
    })
    .await?;
    debug!("Push subscription stored");
    Ok(Json(SuccessResponse::ok()))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PushUnsubscribeRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let address = normalize_any(&required(req.user_address, "User address is required")?);
    let endpoint = required(req.endpoint, "Endpoint is required")?;

    with_db(&state, move |db| db.delete_push_subscription(&address, &endpoint)).await?;
    Ok(Json(SuccessResponse::ok()))
}

pub async fn status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<PushStatusResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);
    let subscribed = with_db(&state, move |db| db.has_push_subscription(&address)).await?;
    Ok(Json(PushStatusResponse { subscribed }))
}
