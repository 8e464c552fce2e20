//! Cryptographic helpers for ticket ids.
//!
//! This module provides:
//! - Cryptographically secure random tokens for ticket ids
//! - Short SHA-256 fingerprints so ids can be logged without leaking them

pub mod fingerprint;
pub mod random;

pub use fingerprint::{digest_hex, fingerprint};
