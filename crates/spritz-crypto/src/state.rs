//! OAuth `state` parameter for the calendar connect flow.
//!
//! The state is base64url JSON naming the wallet that started the flow. It is
//! tagged with an HMAC over the address and issue time so a callback cannot
//! bind tokens to an address that never asked for them.

use anyhow::{Result, anyhow, bail};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatePayload {
    user_address: String,
    issued_at: i64,
    sig: String,
}

fn tag(secret: &[u8], user_address: &str, issued_at: i64) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| anyhow!("Bad HMAC key: {}", e))?;
    mac.update(user_address.as_bytes());
    mac.update(b":");
    mac.update(issued_at.to_string().as_bytes());
    Ok(mac)
}

/// Encode the state for `user_address` at unix time `issued_at`.
pub fn encode_state(secret: &[u8], user_address: &str, issued_at: i64) -> Result<String> {
    let sig = hex::encode(tag(secret, user_address, issued_at)?.finalize().into_bytes());
    let payload = StatePayload {
        user_address: user_address.to_string(),
        issued_at,
        sig,
    };
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?))
}

/// Decode and authenticate a state, returning the wallet address.
/// States older than `max_age_secs` at unix time `now` are rejected.
pub fn decode_state(secret: &[u8], raw: &str, now: i64, max_age_secs: i64) -> Result<String> {
    let bytes = URL_SAFE_NO_PAD.decode(raw.trim())?;
    let payload: StatePayload = serde_json::from_slice(&bytes)?;

    let sig = hex::decode(&payload.sig)?;
    tag(secret, &payload.user_address, payload.issued_at)?
        .verify_slice(&sig)
        .map_err(|_| anyhow!("State signature mismatch"))?;

    if now - payload.issued_at > max_age_secs || payload.issued_at > now + 60 {
        bail!("State expired");
    }
    if payload.user_address.trim().is_empty() {
        bail!("State has no address");
    }
    Ok(payload.user_address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn state_roundtrip() {
        let state = encode_state(SECRET, "0xabc", 1_000).unwrap();
        assert_eq!(decode_state(SECRET, &state, 1_100, 900).unwrap(), "0xabc");
    }

    #[test]
    fn forged_address_is_rejected() {
        let state = encode_state(SECRET, "0xabc", 1_000).unwrap();
        let mut payload: StatePayload =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        payload.user_address = "0xevil".to_string();
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());

        assert!(decode_state(SECRET, &forged, 1_100, 900).is_err());
    }

    #[test]
    fn stale_or_foreign_state_is_rejected() {
        let state = encode_state(SECRET, "0xabc", 1_000).unwrap();
        assert!(decode_state(SECRET, &state, 5_000, 900).is_err());
        assert!(decode_state(b"other", &state, 1_100, 900).is_err());
        assert!(decode_state(SECRET, "%%%", 1_100, 900).is_err());
    }
}
