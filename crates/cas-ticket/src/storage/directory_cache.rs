//! Filesystem-backed [`TicketCache`].
//!
//! Stores each entry as a JSON envelope under a directory:
//!
//! ```text
//! {base_dir}/
//! └── {sha256_hex(key)}.json
//! ```
//!
//! File format:
//! ```json
//! { "version": 1, "key": "...", "expires_at_ms": 1700000000000, "payload": "<base64>" }
//! ```
//!
//! File names are a digest of the key, so they have the same length
//! however long the ticket ids are configured to be. The key itself is
//! kept in the envelope.
//!
//! Writes go through a temporary file. `add` publishes it with a hard
//! link, which fails if the target exists, so concurrent adders on a shared
//! directory cannot both win. `replace` is check-then-write and may race
//! with a concurrent `delete` on another node.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::{digest_hex, random};
use crate::error::{Result, TicketError};
use crate::time::{Clock, SystemClock};

use super::{expires_at, is_lapsed, TicketCache};

// ── File format constants ─────────────────────────────────────────────────────

const CACHE_FILE_VERSION: u32 = 1;
const ENTRY_EXT: &str = "json";
const TEMP_EXT: &str = "tmp";

// ── On-disk structures ────────────────────────────────────────────────────────

/// Wrapper written to disk for each entry.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntryFile {
    /// Format version number.
    version: u32,
    /// The original key.
    key: String,
    /// Physical expiry (milliseconds since epoch), if any.
    expires_at_ms: Option<u64>,
    /// Base64 of the stored bytes.
    payload: String,
}

// ── DirectoryCache ────────────────────────────────────────────────────────────

/// Directory-backed cache, one file per key.
#[derive(Debug)]
pub struct DirectoryCache {
    base_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl DirectoryCache {
    /// Create a cache rooted at `base_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::Io` if the directory cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_clock(base_dir, Arc::new(SystemClock))
    }

    /// Same as [`new`](Self::new) with an explicit clock.
    pub fn with_clock(base_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir, clock })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// `{base_dir}/{sha256_hex(key)}.json`.
    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{ENTRY_EXT}", digest_hex(key)))
    }

    /// Serialize an envelope into a fresh temporary file and return its path.
    fn write_temp(&self, key: &str, value: &[u8], ttl_ms: Option<u64>) -> Result<PathBuf> {
        let file = CacheEntryFile {
            version: CACHE_FILE_VERSION,
            key: key.to_string(),
            expires_at_ms: expires_at(self.clock.now_millis(), ttl_ms),
            payload: base64::engine::general_purpose::STANDARD.encode(value),
        };

        let json = serde_json::to_vec(&file)
            .map_err(|e| TicketError::Serialization(e.to_string()))?;

        let tmp = self.base_dir.join(format!(
            "{}.{}.{TEMP_EXT}",
            digest_hex(key),
            random::random_token(8)
        ));
        std::fs::write(&tmp, json)?;
        Ok(tmp)
    }

    /// Read an envelope. A missing file is `Ok(None)`.
    fn read_entry(&self, path: &Path) -> Result<Option<CacheEntryFile>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file: CacheEntryFile = serde_json::from_slice(&bytes).map_err(|e| {
            TicketError::Serialization(format!(
                "failed to parse cache entry {}: {e}",
                path.display()
            ))
        })?;

        if file.version != CACHE_FILE_VERSION {
            return Err(TicketError::Serialization(format!(
                "unsupported cache entry version {} in {}",
                file.version,
                path.display()
            )));
        }
        Ok(Some(file))
    }

    /// Read a live envelope, removing it if it has lapsed.
    fn read_live(&self, path: &Path) -> Result<Option<CacheEntryFile>> {
        match self.read_entry(path)? {
            Some(file) if is_lapsed(file.expires_at_ms, self.clock.now_millis()) => {
                remove_if_present(path)?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXT) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

/// Remove a file, treating "already gone" as success. Returns whether this
/// call removed it.
fn remove_if_present(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl TicketCache for DirectoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(file) = self.read_live(&self.entry_path(key))? else {
            return Ok(None);
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(file.payload)
            .map_err(|e| TicketError::Serialization(format!("invalid cache payload: {e}")))?;
        Ok(Some(bytes))
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<()> {
        let tmp = self.write_temp(key, &value, ttl_ms)?;
        std::fs::rename(&tmp, self.entry_path(key))?;
        Ok(())
    }

    fn add(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<bool> {
        let path = self.entry_path(key);
        // Clear a lapsed entry so the link below can succeed.
        self.read_live(&path)?;

        let tmp = self.write_temp(key, &value, ttl_ms)?;
        let linked = std::fs::hard_link(&tmp, &path);
        remove_if_present(&tmp)?;

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn replace(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<bool> {
        if self.read_live(&self.entry_path(key))?.is_none() {
            return Ok(false);
        }
        self.set(key, value, ttl_ms)?;
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key);
        if self.read_live(&path)?.is_none() {
            return Ok(false);
        }
        remove_if_present(&path)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for path in self.entry_paths()? {
            if let Some(file) = self.read_live(&path)? {
                keys.push(file.key);
            }
        }
        Ok(keys)
    }

    fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now_millis();
        let mut purged = 0;
        for path in self.entry_paths()? {
            match self.read_entry(&path) {
                Ok(Some(file)) if is_lapsed(file.expires_at_ms, now) => {
                    if remove_if_present(&path)? {
                        purged += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => log::warn!("skipping unreadable cache entry {}: {e}", path.display()),
            }
        }
        Ok(purged)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
