use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use spritz_crypto::keys::key_from_base64;
use spritz_db::models::{GroupInvitationRow, GroupRow};
use spritz_types::api::{
    AcceptInvitationResponse, AddressBody, CreateGroupRequest, CreateGroupResponse,
    GroupListResponse, InvitationListResponse, SuccessResponse,
};
use spritz_types::models::{InvitationStatus, normalize_any};

use crate::calendar::AddressQuery;
use crate::error::{ApiError, ApiResult, required};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::{AppState, read_or_empty, with_db};

const MAX_GROUP_NAME_CHARS: usize = 100;

/// The group key is generated client side; the server only checks that it
/// is a well-formed 32-byte key before handing copies to invitees.
pub async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    let creator = normalize_any(&required(req.creator_address, "Creator address is required")?);
    let name = required(req.name, "Group name is required")?;
    if name.chars().count() > MAX_GROUP_NAME_CHARS {
        return Err(ApiError::bad_request("Group name is too long"));
    }
    let group_key = required(req.group_key, "Group key is required")?;
    key_from_base64(&group_key).map_err(|_| ApiError::bad_request("Group key must be 32 bytes of base64"))?;

    let mut members: Vec<String> = req
        .member_addresses
        .iter()
        .map(|a| normalize_any(a))
        .filter(|a| !a.is_empty() && *a != creator)
        .collect();
    members.sort();
    members.dedup();

    let (group_id, invitations_sent) =
        with_db(&state, move |db| db.create_group(&name, &creator, &members, &group_key)).await?;
    info!("Group {} created with {} invitations", group_id, invitations_sent);

    let group_id: Uuid = group_id
        .parse()
        .map_err(|e| anyhow::anyhow!("Generated group id is not a UUID: {}", e))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateGroupResponse {
            group_id,
            invitations_sent,
        }),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<GroupListResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);
    let rows = with_db(&state, move |db| db.groups_for_member(&address)).await?;
    Ok(Json(GroupListResponse {
        groups: rows.into_iter().map(GroupRow::into_view).collect(),
    }))
}

pub async fn invitations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<InvitationListResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);
    let rows = read_or_empty(&state, "group_invitations", move |db| {
        db.pending_group_invitations(&address)
    })
    .await?;
    Ok(Json(InvitationListResponse {
        invitations: rows.into_iter().map(GroupInvitationRow::into_view).collect(),
    }))
}

async fn answerable(state: &AppState, id: &str, caller: &str) -> ApiResult<GroupInvitationRow> {
    let lookup = id.to_string();
    let row = with_db(state, move |db| db.get_group_invitation(&lookup))
        .await?
        .ok_or_else(|| ApiError::not_found("Invitation not found"))?;

    if row.invitee_address != caller {
        return Err(ApiError::Forbidden("Only the invitee can answer this invitation".into()));
    }
    if row.status() != InvitationStatus::Pending {
        return Err(ApiError::Conflict("Invitation is no longer pending".into()));
    }
    Ok(row)
}

pub async fn accept(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AddressBody>,
) -> ApiResult<Json<AcceptInvitationResponse>> {
    let caller = normalize_any(&required(req.user_address, "User address is required")?);
    let row = answerable(&state, &id, &caller).await?;

    if !with_db(&state, move |db| db.accept_group_invitation(&id)).await? {
        return Err(ApiError::Conflict("Invitation is no longer pending".into()));
    }
    info!("{} joined group {}", caller, row.group_id);

    let view = row.into_view();
    Ok(Json(AcceptInvitationResponse {
        group_id: view.group_id,
        group_key: view.group_key,
    }))
}

pub async fn decline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AddressBody>,
) -> ApiResult<Json<SuccessResponse>> {
    let caller = normalize_any(&required(req.user_address, "User address is required")?);
    answerable(&state, &id, &caller).await?;

    if !with_db(&state, move |db| db.decline_group_invitation(&id)).await? {
        return Err(ApiError::Conflict("Invitation is no longer pending".into()));
    }
    Ok(Json(SuccessResponse::ok()))
}
