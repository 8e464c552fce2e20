//! Key/value cache backends for shared ticket storage.
//!
//! A [`TicketCache`] stores opaque bytes under string keys, each entry with
//! an optional physical TTL. It is the seam where a distributed cache
//! client (memcached-style) plugs in; [`crate::registry::CacheTicketRegistry`]
//! layers ticket semantics on top.
//!
//! # Modules
//!
//! - [`memory_cache`]: in-process cache honouring TTLs.
//! - [`directory_cache`]: one JSON envelope file per key, for a directory
//!   shared by several nodes or inspected by operators.
//!
//! # Directory layout
//!
//! ```text
//! {base_dir}/
//! └── {sha256_hex(key)}.json
//! ```

pub mod directory_cache;
pub mod memory_cache;

use crate::error::Result;

pub use directory_cache::DirectoryCache;
pub use memory_cache::MemoryCache;

/// Byte-oriented key/value cache with per-entry expiry.
///
/// `ttl_ms` of `None` means the entry never expires physically. Expired
/// entries behave exactly like absent ones.
pub trait TicketCache: Send + Sync {
    /// Read a live entry.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write unconditionally.
    fn set(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<()>;

    /// Write only if no live entry exists. Returns whether it was written.
    fn add(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<bool>;

    /// Write only if a live entry exists. Returns whether it was written.
    fn replace(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<bool>;

    /// Remove an entry. Returns whether a live entry was removed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Keys of all live entries.
    fn keys(&self) -> Result<Vec<String>>;

    /// Drop entries whose TTL has passed. Returns how many were dropped.
    fn purge_expired(&self) -> Result<usize>;
}

impl<T: TicketCache + ?Sized> TicketCache for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<()> {
        (**self).set(key, value, ttl_ms)
    }

    fn add(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<bool> {
        (**self).add(key, value, ttl_ms)
    }

    fn replace(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<bool> {
        (**self).replace(key, value, ttl_ms)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }

    fn purge_expired(&self) -> Result<usize> {
        (**self).purge_expired()
    }
}

/// Absolute expiry for a TTL starting at `now`.
pub(crate) fn expires_at(now: u64, ttl_ms: Option<u64>) -> Option<u64> {
    ttl_ms.map(|ttl| now.saturating_add(ttl))
}

/// Has an entry with this expiry lapsed at `now`?
pub(crate) fn is_lapsed(expires_at_ms: Option<u64>, now: u64) -> bool {
    expires_at_ms.is_some_and(|at| now >= at)
}
