use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use spritz_types::api::SessionClaims;
use spritz_types::models::WalletType;

use crate::error::ApiError;
use crate::state::AppState;

/// Lifetime of a session issued after a verified sign-in.
pub const SESSION_TTL_DAYS: i64 = 7;

pub fn issue_session(secret: &str, wallet_address: &str, wallet_type: WalletType) -> anyhow::Result<String> {
    let claims = SessionClaims {
        sub: wallet_address.to_string(),
        wallet_type,
        exp: (Utc::now() + Duration::days(SESSION_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_session(secret: &str, token: &str) -> Option<SessionClaims> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Validate the Bearer session token and expose its claims to the handler.
pub async fn require_session(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| ApiError::Unauthorized("Missing session token".into()))?;

    let claims = decode_session(&state.config.session_secret, bearer.token())
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_roundtrip() {
        let token = issue_session("secret", "So1ana", WalletType::Solana).unwrap();
        let claims = decode_session("secret", &token).unwrap();
        assert_eq!(claims.sub, "So1ana");
        assert_eq!(claims.wallet_type, WalletType::Solana);
        assert!(decode_session("other", &token).is_none());
    }
}
