//! Sign-In With Solana.
//!
//! The server hands out a plain-text message embedding a one-time nonce; the
//! wallet signs it with the account's ed25519 key and the server checks the
//! signature against the base58 public key, which is the address itself.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, SecondsFormat, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

const STATEMENT: &str = "Sign in to Spritz";

#[derive(Error, Debug)]
pub enum SiwsError {
    #[error("address is not a valid base58 ed25519 public key")]
    InvalidAddress,
    #[error("signature is neither base58 nor base64 of 64 bytes")]
    InvalidSignatureEncoding,
    #[error("signature does not match message")]
    BadSignature(#[from] ed25519_dalek::SignatureError),
    #[error("message is missing the {0} field")]
    MissingField(&'static str),
    #[error("message was issued for a different {0}")]
    Mismatch(&'static str),
}

/// The fields of a sign-in message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiwsMessage {
    pub domain: String,
    pub address: String,
    pub uri: String,
    pub nonce: String,
    pub issued_at: String,
}

impl SiwsMessage {
    pub fn new(domain: &str, address: &str, uri: &str, nonce: &str, issued_at: DateTime<Utc>) -> Self {
        Self {
            domain: domain.to_string(),
            address: address.to_string(),
            uri: uri.to_string(),
            nonce: nonce.to_string(),
            issued_at: issued_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Render in the layout wallets display to the user.
    pub fn render(&self) -> String {
        format!(
            "{domain} wants you to sign in with your Solana account:\n\
             {address}\n\
             \n\
             {STATEMENT}\n\
             \n\
             URI: {uri}\n\
             Version: 1\n\
             Chain ID: mainnet\n\
             Nonce: {nonce}\n\
             Issued At: {issued_at}",
            domain = self.domain,
            address = self.address,
            uri = self.uri,
            nonce = self.nonce,
            issued_at = self.issued_at,
        )
    }

    /// Parse a message previously produced by [`SiwsMessage::render`].
    pub fn parse(text: &str) -> Result<Self, SiwsError> {
        let mut lines = text.lines();

        let domain = lines
            .next()
            .and_then(|l| l.strip_suffix(" wants you to sign in with your Solana account:"))
            .ok_or(SiwsError::MissingField("domain"))?;
        let address = lines
            .next()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(SiwsError::MissingField("address"))?;

        let field = |name: &'static str| -> Result<String, SiwsError> {
            text.lines()
                .find_map(|l| l.strip_prefix(name).and_then(|rest| rest.strip_prefix(": ")))
                .map(|v| v.trim().to_string())
                .ok_or(SiwsError::MissingField(name))
        };

        Ok(Self {
            domain: domain.to_string(),
            address: address.to_string(),
            uri: field("URI")?,
            nonce: field("Nonce")?,
            issued_at: field("Issued At")?,
        })
    }

    /// The message must be addressed to us and to the claimed account.
    pub fn check_bound_to(&self, domain: &str, address: &str) -> Result<(), SiwsError> {
        if self.domain != domain {
            return Err(SiwsError::Mismatch("domain"));
        }
        if self.address != address {
            return Err(SiwsError::Mismatch("address"));
        }
        Ok(())
    }
}

/// Verify that `signature` is `address`'s ed25519 signature over `message`.
pub fn verify_signature(address: &str, message: &str, signature: &str) -> Result<(), SiwsError> {
    let key_bytes: [u8; 32] = bs58::decode(address.trim())
        .into_vec()
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or(SiwsError::InvalidAddress)?;
    let verifying_key =
        VerifyingKey::from_bytes(&key_bytes).map_err(|_| SiwsError::InvalidAddress)?;

    let signature = decode_signature(signature)?;
    verifying_key.verify(message.as_bytes(), &signature)?;
    Ok(())
}

fn decode_signature(encoded: &str) -> Result<Signature, SiwsError> {
    let encoded = encoded.trim();
    let bytes = bs58::decode(encoded)
        .into_vec()
        .ok()
        .filter(|b| b.len() == Signature::BYTE_SIZE)
        .or_else(|| BASE64.decode(encoded).ok())
        .ok_or(SiwsError::InvalidSignatureEncoding)?;
    Signature::from_slice(&bytes).map_err(|_| SiwsError::InvalidSignatureEncoding)
}
