//! Log-safe fingerprints of secret identifiers.

use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a fingerprint.
const FINGERPRINT_BYTES: usize = 6;

/// Return a short hex fingerprint of `secret`.
///
/// Ticket ids are bearer credentials. Anything written to a log uses this
/// fingerprint instead of the id.
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

/// Full hex SHA-256 of `input`: 64 characters whatever the input length.
pub fn digest_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
