use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use spritz_crypto::codes;
use spritz_crypto::siws::{self, SiwsMessage};
use spritz_db::queries::{LoginOutcome, LoginRecord};
use spritz_db::{Database, encode_ts};
use spritz_types::api::{
    LoginRequest, LoginResponse, SessionClaims, SessionResponse, SiwsNonceResponse,
    SiwsVerifyRequest, SiwsVerifyResponse,
};
use spritz_types::models::{WalletType, normalize_address};

use crate::error::{ApiError, ApiResult, required};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::issue_session;
use crate::state::{AppState, with_db};

/// How long a sign-in nonce may wait for its signature.
pub const SIWS_NONCE_TTL_MINUTES: i64 = 10;

pub(crate) struct TrackedLogin {
    pub outcome: LoginOutcome,
    pub invite_redeemed: bool,
}

/// Record a login and, for a first login carrying an invite code, try the
/// user invite table first and the admin invite table second. A failed
/// redemption never fails the login.
pub(crate) fn track_login(
    db: &Database,
    record: &LoginRecord,
    invite_code: Option<&str>,
) -> anyhow::Result<TrackedLogin> {
    let outcome = db.record_login(record)?;

    let code = match (&outcome, invite_code) {
        (LoginOutcome::Created(_), Some(code)) => codes::normalize_code(code),
        _ => {
            return Ok(TrackedLogin {
                outcome,
                invite_redeemed: false,
            });
        }
    };
    if code.is_empty() {
        return Ok(TrackedLogin {
            outcome,
            invite_redeemed: false,
        });
    }

    let address = &record.wallet_address;
    let redeemed = match db.redeem_user_invite(&code, address) {
        Ok(true) => true,
        Ok(false) => redeem_admin(db, &code, address),
        Err(e) => {
            warn!("User invite redemption failed for {}: {:#}", address, e);
            redeem_admin(db, &code, address)
        }
    };

    if !redeemed {
        info!("Invite code {} not redeemable for {}", code, address);
        return Ok(TrackedLogin {
            outcome,
            invite_redeemed: false,
        });
    }

    // Reload so the response carries referred_by.
    let outcome = match db.get_user(address)? {
        Some(user) => LoginOutcome::Created(user),
        None => outcome,
    };
    Ok(TrackedLogin {
        outcome,
        invite_redeemed: true,
    })
}

fn redeem_admin(db: &Database, code: &str, address: &str) -> bool {
    db.redeem_admin_invite(code, address).unwrap_or_else(|e| {
        warn!("Admin invite redemption failed for {}: {:#}", address, e);
        false
    })
}

fn banned_response(reason: Option<String>) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({
            "error": "Account is banned",
            "banned": true,
            "reason": reason,
        })),
    )
        .into_response()
}

pub async fn login(State(state): State<AppState>, ApiJson(req): ApiJson<LoginRequest>) -> ApiResult<Response> {
    let raw = required(req.wallet_address, "Wallet address is required")?;
    let wallet_type = req.wallet_type.unwrap_or_else(|| WalletType::detect(&raw));
    let wallet_address = normalize_address(&raw, wallet_type);

    let record = LoginRecord {
        wallet_address: wallet_address.clone(),
        wallet_type: wallet_type.as_str().to_string(),
        chain: req.chain,
        ens_name: req.ens_name,
        username: req.username,
    };
    let invite_code = req.invite_code;

    let tracked = with_db(&state, move |db| track_login(db, &record, invite_code.as_deref())).await?;

    let (user, is_new_user) = match tracked.outcome {
        LoginOutcome::Banned(user) => {
            warn!("Refused login for banned wallet {}", wallet_address);
            return Ok(banned_response(user.ban_reason));
        }
        LoginOutcome::Created(user) => (user, true),
        LoginOutcome::Returning(user) => (user, false),
    };

    if is_new_user {
        info!("New user {} ({})", wallet_address, wallet_type.as_str());
    }

    Ok(Json(LoginResponse {
        success: true,
        user: user.into_profile(),
        is_new_user,
        invite_redeemed: tracked.invite_redeemed,
    })
    .into_response())
}

// -- Sign-In With Solana --

#[derive(Debug, Deserialize)]
pub struct NonceQuery {
    pub address: Option<String>,
}

pub async fn siws_nonce(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NonceQuery>,
) -> ApiResult<Json<SiwsNonceResponse>> {
    let address = required(query.address, "Address is required")?;
    let nonce = codes::nonce();
    let now = Utc::now();
    let expires_at = encode_ts(now + Duration::minutes(SIWS_NONCE_TTL_MINUTES));

    let message = SiwsMessage::new(
        &state.config.siws_domain,
        &address,
        &state.config.app_url,
        &nonce,
        now,
    )
    .render();

    {
        let nonce = nonce.clone();
        with_db(&state, move |db| {
            db.purge_expired_siws_nonces()?;
            db.insert_siws_nonce(&nonce, &address, &expires_at)
        })
        .await?;
    }

    Ok(Json(SiwsNonceResponse { nonce, message }))
}

pub async fn siws_verify(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SiwsVerifyRequest>,
) -> ApiResult<Response> {
    let address = required(req.address, "Address is required")?;
    let message = required(req.message, "Message is required")?;
    let signature = required(req.signature, "Signature is required")?;

    let unauthorized = |e: siws::SiwsError| {
        warn!("SIWS verification failed for {}: {}", address, e);
        ApiError::Unauthorized("Signature verification failed".into())
    };

    let parsed = SiwsMessage::parse(&message).map_err(unauthorized)?;
    parsed
        .check_bound_to(&state.config.siws_domain, &address)
        .map_err(unauthorized)?;
    siws::verify_signature(&address, &message, &signature).map_err(unauthorized)?;

    let record = LoginRecord {
        wallet_address: normalize_address(&address, WalletType::Solana),
        wallet_type: WalletType::Solana.as_str().to_string(),
        ..Default::default()
    };
    let nonce = parsed.nonce;
    let nonce_owner = address.clone();

    let tracked = with_db(&state, move |db| {
        if !db.consume_siws_nonce(&nonce, &nonce_owner)? {
            return Ok(None);
        }
        track_login(db, &record, None).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::Unauthorized("Nonce expired or already used".into()))?;

    let user = match tracked.outcome {
        LoginOutcome::Banned(user) => return Ok(banned_response(user.ban_reason)),
        LoginOutcome::Created(user) | LoginOutcome::Returning(user) => user,
    };

    let token = issue_session(&state.config.session_secret, &user.wallet_address, WalletType::Solana)?;
    info!("Solana sign-in for {}", user.wallet_address);

    Ok(Json(SiwsVerifyResponse {
        success: true,
        token,
        user: user.into_profile(),
    })
    .into_response())
}

pub async fn session(Extension(claims): Extension<SessionClaims>) -> Json<SessionResponse> {
    Json(SessionResponse {
        wallet_address: claims.sub,
        wallet_type: claims.wallet_type,
    })
}
