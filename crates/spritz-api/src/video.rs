//! Video-call provider: room provisioning and participant access tokens.

use anyhow::{Result, anyhow, bail};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::Huddle01Config;

/// Lifetime of a token for a plain room.
pub const TOKEN_TTL_HOURS: i64 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProduceSources {
    pub cam: bool,
    pub mic: bool,
    pub screen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub admin: bool,
    pub can_consume: bool,
    pub can_produce: bool,
    pub can_produce_sources: ProduceSources,
    pub can_send_data: bool,
    pub can_recv_data: bool,
    pub can_update_metadata: bool,
}

impl Permissions {
    pub fn host() -> Self {
        Self {
            admin: true,
            can_consume: true,
            can_produce: true,
            can_produce_sources: ProduceSources {
                cam: true,
                mic: true,
                screen: true,
            },
            can_send_data: true,
            can_recv_data: true,
            can_update_metadata: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub room_id: String,
    pub role: String,
    pub permissions: Permissions,
    pub metadata: Value,
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
}

/// Every participant is minted host permissions. Narrower guest roles trip
/// provider-side permission bugs (media tracks refused mid-call), so role is
/// not used to restrict anything here.
pub fn mint_token(
    cfg: &Huddle01Config,
    room_id: &str,
    display_name: Option<&str>,
    wallet_address: Option<&str>,
    ttl: Duration,
) -> Result<String> {
    let now = Utc::now();
    let claims = AccessClaims {
        room_id: room_id.to_string(),
        role: "host".to_string(),
        permissions: Permissions::host(),
        metadata: serde_json::json!({
            "displayName": display_name.unwrap_or("Guest"),
            "walletAddress": wallet_address,
        }),
        iss: cfg.project_id.clone(),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.api_key.as_bytes()),
    )?;
    Ok(token)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomBody<'a> {
    title: &'a str,
    host_wallets: [&'a str; 1],
}

/// Ask the provider for a new room and return its id.
pub async fn create_room(
    http: &reqwest::Client,
    cfg: &Huddle01Config,
    title: &str,
    host_wallet: &str,
) -> Result<String> {
    let resp = http
        .post(format!("{}/sdk/rooms/create-room", cfg.api_url.trim_end_matches('/')))
        .header("x-api-key", &cfg.api_key)
        .json(&CreateRoomBody {
            title,
            host_wallets: [host_wallet],
        })
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("Room provider returned {}: {}", status, body);
    }

    let body: Value = resp.json().await?;
    room_id_from(&body).ok_or_else(|| anyhow!("Room provider response has no roomId"))
}

fn room_id_from(body: &Value) -> Option<String> {
    body.pointer("/data/roomId")
        .or_else(|| body.get("roomId"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
