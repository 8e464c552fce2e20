//! Usage bookkeeping shared by every ticket kind.

use serde::{Deserialize, Serialize};

/// Timestamps and counters an [`super::ExpirationPolicy`] decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketState {
    /// Creation time (milliseconds since epoch).
    pub created_ms: u64,
    /// Time of the most recent successful use. Equal to `created_ms`
    /// until the first use.
    pub last_used_ms: u64,
    /// Time of the use before the most recent one.
    pub previous_used_ms: u64,
    /// Number of successful uses.
    pub usage_count: u64,
}

impl TicketState {
    /// State of a ticket created at `now`.
    pub fn new(now: u64) -> Self {
        Self {
            created_ms: now,
            last_used_ms: now,
            previous_used_ms: now,
            usage_count: 0,
        }
    }

    /// Record one successful use at `now`.
    pub fn record_use(&mut self, now: u64) {
        self.previous_used_ms = self.last_used_ms;
        self.last_used_ms = now;
        self.usage_count = self.usage_count.saturating_add(1);
    }

    /// Milliseconds since creation; zero if the clock went backwards.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_ms)
    }

    /// Milliseconds since the last use; zero if the clock went backwards.
    pub fn idle_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_used_ms)
    }
}
