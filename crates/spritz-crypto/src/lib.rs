/// Spritz crypto helpers.
///
/// The server never encrypts chat content. Group keys are generated and used
/// by clients; the server only validates and relays copies of them inside
/// group invitations. What lives here is authentication material:
/// - Sign-In With Solana message handling and ed25519 verification
/// - HMAC-tagged OAuth state
/// - Invite, join-code and nonce generation
pub mod codes;
pub mod keys;
pub mod siws;
pub mod state;
