//! In-process [`TicketCache`].

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::Result;
use crate::time::{Clock, SystemClock};

use super::{expires_at, is_lapsed, TicketCache};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at_ms: Option<u64>,
}

/// Concurrent in-memory cache with per-entry TTLs.
///
/// Stands in for a networked cache in tests and single-node deployments
/// that still want physical expiry of forgotten tickets.
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    fn entry(&self, value: Vec<u8>, ttl_ms: Option<u64>) -> CacheEntry {
        CacheEntry {
            value,
            expires_at_ms: expires_at(self.clock.now_millis(), ttl_ms),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = self.clock.now_millis();
        self.entries
            .remove_if(key, |_, e| is_lapsed(e.expires_at_ms, now));
        Ok(self.entries.get(key).map(|e| e.value.clone()))
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<()> {
        self.entries.insert(key.to_string(), self.entry(value, ttl_ms));
        Ok(())
    }

    fn add(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<bool> {
        let now = self.clock.now_millis();
        let fresh = self.entry(value, ttl_ms);
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                if is_lapsed(slot.get().expires_at_ms, now) {
                    slot.insert(fresh);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                Ok(true)
            }
        }
    }

    fn replace(&self, key: &str, value: Vec<u8>, ttl_ms: Option<u64>) -> Result<bool> {
        let now = self.clock.now_millis();
        match self.entries.get_mut(key) {
            Some(mut slot) if !is_lapsed(slot.expires_at_ms, now) => {
                *slot = self.entry(value, ttl_ms);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let now = self.clock.now_millis();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, e)| !is_lapsed(e.expires_at_ms, now)))
    }

    fn keys(&self) -> Result<Vec<String>> {
        let now = self.clock.now_millis();
        Ok(self
            .entries
            .iter()
            .filter(|e| !is_lapsed(e.expires_at_ms, now))
            .map(|e| e.key().clone())
            .collect())
    }

    fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now_millis();
        let before = self.entries.len();
        self.entries.retain(|_, e| !is_lapsed(e.expires_at_ms, now));
        Ok(before.saturating_sub(self.entries.len()))
    }
}
