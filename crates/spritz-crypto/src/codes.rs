use rand::Rng;

/// Uppercase alphabet without the look-alikes 0/O and 1/I/L.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub const INVITE_CODE_LEN: usize = 8;
pub const JOIN_CODE_LEN: usize = 8;

/// Random code drawn from [`CODE_ALPHABET`].
pub fn random_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn invite_code() -> String {
    random_code(INVITE_CODE_LEN)
}

pub fn join_code() -> String {
    random_code(JOIN_CODE_LEN)
}

/// Codes are typed by hand; compare them case-insensitively.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Random alphanumeric nonce for sign-in messages.
pub fn nonce() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}
