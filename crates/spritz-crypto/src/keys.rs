use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

/// Length of a group's symmetric key.
pub const GROUP_KEY_LEN: usize = 32;

/// Generate a random 256-bit group key.
/// Members normally bring their own; the server only relays copies.
pub fn generate_group_key() -> [u8; GROUP_KEY_LEN] {
    rand::random()
}

/// Encode a key to base64 for display/sharing.
pub fn key_to_base64(key: &[u8; GROUP_KEY_LEN]) -> String {
    BASE64.encode(key)
}

/// Decode a base64 key.
pub fn key_from_base64(encoded: &str) -> Result<[u8; GROUP_KEY_LEN]> {
    let bytes = BASE64.decode(encoded.trim())?;
    let key: [u8; GROUP_KEY_LEN] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Invalid key length"))?;
    Ok(key)
}
