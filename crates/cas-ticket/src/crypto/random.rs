//! Secure random number generation.
//!
//! Uses the operating system's cryptographic random source via `rand`.

use rand::RngCore;

/// Fill a buffer with cryptographically secure random bytes.
pub fn fill_random(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
}

/// Generate `len` cryptographically secure random bytes.
pub fn random_vec(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    fill_random(&mut buf);
    buf
}

/// Generate a random token of `len` bytes encoded as base58.
///
/// Base58 keeps tokens free of characters that need escaping in URLs,
/// cookies, and cache keys.
pub fn random_token(len: usize) -> String {
    bs58::encode(random_vec(len)).into_string()
}
