use axum::{
    Json,
    extract::State,
    response::Redirect,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use spritz_crypto::state::{decode_state, encode_state};
use spritz_db::models::{CalendarConnectionRow, CalendarTokens};
use spritz_db::{decode_opt_ts, encode_ts};
use spritz_types::api::{AddressBody, CalendarConnectResponse, CalendarStatusResponse, SuccessResponse};
use spritz_types::models::normalize_any;

use crate::error::{ApiError, ApiResult, required};
use crate::extract::{ApiJson, ApiQuery};
use crate::google;
use crate::state::{AppState, GoogleConfig, read_or_empty, with_db};

pub const PROVIDER_GOOGLE: &str = "google";

/// How long a user has to finish the consent screen.
const STATE_MAX_AGE_SECS: i64 = 15 * 60;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressQuery {
    pub user_address: Option<String>,
}

pub(crate) fn google_config(state: &AppState) -> ApiResult<&GoogleConfig> {
    state
        .config
        .google
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Google Calendar is not configured".into()))
}

pub async fn connect(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<CalendarConnectResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);
    let cfg = google_config(&state)?;

    let oauth_state = encode_state(
        state.config.session_secret.as_bytes(),
        &address,
        Utc::now().timestamp(),
    )?;
    let auth_url = google::authorization_url(cfg, &oauth_state)?;

    Ok(Json(CalendarConnectResponse { auth_url }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// OAuth redirect target. Always answers with a redirect back into the app.
pub async fn callback(State(state): State<AppState>, ApiQuery(query): ApiQuery<CallbackQuery>) -> Redirect {
    let target = match finish_connect(&state, query).await {
        Ok(address) => {
            info!("Google Calendar connected for {}", address);
            format!("{}/?calendar=connected", state.config.app_url)
        }
        Err(reason) => format!("{}/?calendar=error&reason={}", state.config.app_url, reason),
    };
    Redirect::to(&target)
}

async fn finish_connect(state: &AppState, query: CallbackQuery) -> Result<String, &'static str> {
    if let Some(err) = query.error {
        warn!("Google consent refused: {}", err);
        return Err("access_denied");
    }
    let code = query.code.filter(|c| !c.is_empty()).ok_or("missing_code")?;
    let raw_state = query.state.ok_or("invalid_state")?;

    let address = decode_state(
        state.config.session_secret.as_bytes(),
        &raw_state,
        Utc::now().timestamp(),
        STATE_MAX_AGE_SECS,
    )
    .map_err(|e| {
        warn!("Rejected OAuth state: {:#}", e);
        "invalid_state"
    })?;

    let cfg = state.config.google.as_ref().ok_or("token_exchange")?;
    let tokens = google::exchange_code(&state.http, cfg, &code)
        .await
        .map_err(|e| {
            error!("Google token exchange failed: {:#}", e);
            "token_exchange"
        })?;

    let calendar = match google::primary_calendar(&state.http, cfg, &tokens.access_token).await {
        Ok(cal) => Some(cal),
        Err(e) => {
            warn!("Could not read primary calendar for {}: {:#}", address, e);
            None
        }
    };

    let row = CalendarTokens {
        token_expires_at: tokens.expires_at(Utc::now()).map(encode_ts),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        calendar_email: calendar.as_ref().map(|c| c.id.clone()),
        calendar_id: calendar.map(|c| c.id),
    };

    let owner = address.clone();
    with_db(state, move |db| db.upsert_calendar_connection(&owner, PROVIDER_GOOGLE, &row))
        .await
        .map_err(|e| {
            error!("Failed to store calendar connection for {}: {:#}", address, e);
            "storage"
        })?;

    Ok(address)
}

pub async fn status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AddressQuery>,
) -> ApiResult<Json<CalendarStatusResponse>> {
    let address = normalize_any(&required(query.user_address, "User address is required")?);

    let row = read_or_empty(&state, "calendar_connections", move |db| {
        db.get_calendar_connection(&address, PROVIDER_GOOGLE)
    })
    .await?;

    let connection = row.filter(|r| r.is_active).map(|r| r.to_view());
    Ok(Json(CalendarStatusResponse {
        connected: connection.is_some(),
        connection,
    }))
}

pub async fn disconnect(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AddressBody>,
) -> ApiResult<Json<SuccessResponse>> {
    let address = normalize_any(&required(req.user_address, "User address is required")?);

    let who = address.clone();
    let row = with_db(&state, move |db| db.get_calendar_connection(&who, PROVIDER_GOOGLE)).await?;

    if let Some(row) = row {
        if let Some(cfg) = state.config.google.as_ref() {
            let token = row.refresh_token.as_deref().unwrap_or(&row.access_token);
            google::revoke(&state.http, cfg, token).await;
        }
        let who = address.clone();
        with_db(&state, move |db| db.delete_calendar_connection(&who, PROVIDER_GOOGLE)).await?;
        info!("Google Calendar disconnected for {}", address);
    }

    Ok(Json(SuccessResponse::ok()))
}

/// A usable access token for `row`, refreshing and persisting it first when
/// it is about to expire.
pub(crate) async fn fresh_access_token(
    state: &AppState,
    cfg: &GoogleConfig,
    row: &CalendarConnectionRow,
) -> anyhow::Result<String> {
    let now = Utc::now();
    if !google::needs_refresh(decode_opt_ts(row.token_expires_at.as_deref()), now) {
        return Ok(row.access_token.clone());
    }
    let Some(refresh_token) = row.refresh_token.as_deref() else {
        return Ok(row.access_token.clone());
    };

    let refreshed = google::refresh_access_token(&state.http, cfg, refresh_token).await?;
    let expires_at = refreshed.expires_at(now).map(encode_ts);
    let access_token = refreshed.access_token;

    let id = row.id.clone();
    let token = access_token.clone();
    with_db(state, move |db| {
        db.update_calendar_access_token(&id, &token, expires_at.as_deref())
    })
    .await?;

    Ok(access_token)
}
