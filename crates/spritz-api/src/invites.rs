use axum::{Json, extract::{Path, State}};
use tracing::info;

use spritz_crypto::codes;
use spritz_db::models::UserInviteRow;
use spritz_db::now_ts;
use spritz_types::api::{InviteCheckResponse, UserInvitesResponse};
use spritz_types::models::normalize_any;

use crate::calendar::AddressQuery;
use crate::error::{ApiResult, required};
use crate::extract::ApiQuery;
use crate::state::{AppState, with_db};

/// Referral codes handed to every user on first request.
pub const USER_INVITE_ALLOCATION: usize = 5;

/// The caller's referral codes, allocated lazily on first request.
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<UserInvitesResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);

    let rows = with_db(&state, move |db| {
        let existing = db.user_invites(&address)?;
        if !existing.is_empty() {
            return Ok(existing);
        }
        let fresh: Vec<String> = (0..USER_INVITE_ALLOCATION).map(|_| codes::invite_code()).collect();
        let created = db.create_user_invites(&address, &fresh)?;
        info!("Allocated {} invite codes to {}", created, address);
        db.user_invites(&address)
    })
    .await?;

    let used = rows.iter().filter(|r| r.used_by.is_some()).count();
    let available = rows.len() - used;
    Ok(Json(UserInvitesResponse {
        invites: rows.into_iter().map(UserInviteRow::into_view).collect(),
        available,
        used,
    }))
}

/// Whether a code would be accepted at login, and from which table.
pub async fn check(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<Json<InviteCheckResponse>> {
    let code = codes::normalize_code(&code);

    let kind = with_db(&state, move |db| {
        if db.user_invite_is_open(&code)? {
            return Ok(Some("user"));
        }
        let admin = db.find_admin_invite(&code)?;
        Ok(admin.filter(|row| row.is_redeemable(&now_ts())).map(|_| "admin"))
    })
    .await?;

    Ok(Json(InviteCheckResponse {
        valid: kind.is_some(),
        kind: kind.map(str::to_string),
    }))
}
