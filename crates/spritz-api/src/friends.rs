use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use spritz_db::decode_opt_ts;
use spritz_db::models::FriendRequestRow;
use spritz_types::api::{
    AddressBody, FriendListResponse, FriendRequestBody, FriendRequestResponse,
    FriendRequestsResponse, SuccessResponse,
};
use spritz_types::models::{FriendRequestStatus, normalize_any};

use crate::calendar::AddressQuery;
use crate::error::{ApiError, ApiResult, required};
use crate::extract::{ApiJson, ApiQuery};
use crate::presence::is_online;
use crate::state::{AppState, with_db};

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<FriendListResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);

    let rows = with_db(&state, move |db| db.list_friends(&address)).await?;
    let now = Utc::now();
    let friends = rows
        .into_iter()
        .map(|row| {
            let online = is_online(decode_opt_ts(row.last_seen.as_deref()), now);
            row.into_view(online)
        })
        .collect();

    Ok(Json(FriendListResponse { friends }))
}

pub async fn requests(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<FriendRequestsResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);

    let (incoming, outgoing) = with_db(&state, move |db| {
        Ok((
            db.incoming_friend_requests(&address)?,
            db.outgoing_friend_requests(&address)?,
        ))
    })
    .await?;

    Ok(Json(FriendRequestsResponse {
        incoming: incoming.into_iter().map(FriendRequestRow::into_view).collect(),
        outgoing: outgoing.into_iter().map(FriendRequestRow::into_view).collect(),
    }))
}

enum SendOutcome {
    Sent(FriendRequestRow),
    AlreadyFriends,
    AlreadyPending,
}

pub async fn send_request(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<FriendRequestBody>,
) -> ApiResult<impl IntoResponse> {
    let from = normalize_any(&required(req.from_address, "From address is required")?);
    let to = normalize_any(&required(req.to_address, "To address is required")?);
    if from == to {
        return Err(ApiError::bad_request("Cannot send a friend request to yourself"));
    }

    let outcome = with_db(&state, move |db| {
        if db.are_friends(&from, &to)? {
            return Ok(SendOutcome::AlreadyFriends);
        }
        if db.pending_request_between(&from, &to)?.is_some() {
            return Ok(SendOutcome::AlreadyPending);
        }
        Ok(SendOutcome::Sent(db.create_friend_request(&from, &to)?))
    })
    .await?;

    match outcome {
        SendOutcome::Sent(row) => {
            info!("Friend request {} -> {}", row.from_address, row.to_address);
            Ok((StatusCode::CREATED, Json(FriendRequestResponse { request: row.into_view() })))
        }
        SendOutcome::AlreadyFriends => Err(ApiError::Conflict("Already friends".into())),
        SendOutcome::AlreadyPending => Err(ApiError::Conflict("Friend request already pending".into())),
    }
}

/// Load a request the caller may answer: the recipient, while it is pending.
async fn answerable(state: &AppState, id: &str, caller: &str) -> ApiResult<FriendRequestRow> {
    let lookup = id.to_string();
    let row = with_db(state, move |db| db.get_friend_request(&lookup))
        .await?
        .ok_or_else(|| ApiError::not_found("Friend request not found"))?;

    if row.to_address != caller {
        return Err(ApiError::Forbidden("Only the recipient can answer this request".into()));
    }
    if row.status() != FriendRequestStatus::Pending {
        return Err(ApiError::Conflict("Friend request is no longer pending".into()));
    }
    Ok(row)
}

pub async fn accept(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AddressBody>,
) -> ApiResult<Json<SuccessResponse>> {
    let caller = normalize_any(&required(req.user_address, "User address is required")?);
    let row = answerable(&state, &id, &caller).await?;

    if !with_db(&state, move |db| db.accept_friend_request(&id)).await? {
        return Err(ApiError::Conflict("Friend request is no longer pending".into()));
    }
    info!("{} and {} are now friends", row.from_address, row.to_address);
    Ok(Json(SuccessResponse::ok()))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AddressBody>,
) -> ApiResult<Json<SuccessResponse>> {
    let caller = normalize_any(&required(req.user_address, "User address is required")?);
    answerable(&state, &id, &caller).await?;

    if !with_db(&state, move |db| db.reject_friend_request(&id)).await? {
        return Err(ApiError::Conflict("Friend request is no longer pending".into()));
    }
    Ok(Json(SuccessResponse::ok()))
}

/// The sender withdraws a pending request.
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let caller = normalize_any(&required(query.user_address, "User address is required")?);

    let lookup = id.clone();
    let row = with_db(&state, move |db| db.get_friend_request(&lookup))
        .await?
        .ok_or_else(|| ApiError::not_found("Friend request not found"))?;
    if row.from_address != caller {
        return Err(ApiError::Forbidden("Only the sender can cancel this request".into()));
    }

    if !with_db(&state, move |db| db.delete_friend_request(&id)).await? {
        return Err(ApiError::Conflict("Friend request is no longer pending".into()));
    }
    Ok(Json(SuccessResponse::ok()))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(friend): Path<String>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let caller = normalize_any(&required(query.user_address, "User address is required")?);
    let friend = normalize_any(&friend);

    if !with_db(&state, move |db| db.remove_friend(&caller, &friend)).await? {
        return Err(ApiError::not_found("Not friends"));
    }
    Ok(Json(SuccessResponse::ok()))
}
