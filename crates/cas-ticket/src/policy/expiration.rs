//! The expiration policy variants.
//!
//! Each ticket embeds exactly one policy chosen when it is created. The
//! policy is serialisable so a ticket written to a shared cache carries its
//! own rules with it.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TicketError};

use super::state::TicketState;

/// Rule deciding when a ticket stops being usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationPolicy {
    /// Never expires on its own; only explicit destruction ends it.
    NeverExpires,
    /// Hard lifetime counted from creation, regardless of use.
    TimeToLive { ttl_ms: u64 },
    /// Hard lifetime plus an idle limit counted from the last use.
    /// Whichever is reached first expires the ticket.
    TimeToLiveWithIdleTimeout { ttl_ms: u64, idle_ms: u64 },
    /// Lifetime counted from the last use, and a minimum gap between uses.
    ///
    /// A ticket used again within `time_in_between_uses_ms` of its previous
    /// use is expired for good. This punishes clients stuck in redirect
    /// loops; it is not a "retry later" signal.
    ThrottledUseAndTimeout {
        time_to_kill_ms: u64,
        time_in_between_uses_ms: u64,
    },
    /// Expires after `max_uses` uses or `ttl_ms` without use.
    MultiUseOrTimeout { max_uses: u64, ttl_ms: u64 },
}

impl ExpirationPolicy {
    /// Decide whether a ticket in `state` is expired at `now`.
    pub fn is_expired(&self, state: &TicketState, now: u64) -> bool {
        match *self {
            Self::NeverExpires => false,
            Self::TimeToLive { ttl_ms } => state.age_ms(now) >= ttl_ms,
            Self::TimeToLiveWithIdleTimeout { ttl_ms, idle_ms } => {
                state.age_ms(now) >= ttl_ms || state.idle_ms(now) >= idle_ms
            }
            Self::ThrottledUseAndTimeout {
                time_to_kill_ms,
                time_in_between_uses_ms,
            } => throttled_is_expired(state, now, time_to_kill_ms, time_in_between_uses_ms),
            Self::MultiUseOrTimeout { max_uses, ttl_ms } => {
                state.usage_count >= max_uses || state.idle_ms(now) >= ttl_ms
            }
        }
    }

    /// Decide whether a ticket has outlived every lifetime bound.
    ///
    /// Same as [`is_expired`](Self::is_expired) except that the throttle
    /// window of [`ThrottledUseAndTimeout`](Self::ThrottledUseAndTimeout) is
    /// ignored: a background sweep is not a use, and must not kill a ticket
    /// that was merely used a moment ago.
    pub fn is_reclaimable(&self, state: &TicketState, now: u64) -> bool {
        match *self {
            Self::ThrottledUseAndTimeout {
                time_to_kill_ms, ..
            } => state.idle_ms(now) >= time_to_kill_ms,
            _ => self.is_expired(state, now),
        }
    }

    /// Upper bound on how long a ticket can stay valid after its most
    /// recent write, or `None` when there is no bound.
    ///
    /// Cache backends use this as a physical TTL backstop.
    pub fn max_lifetime_ms(&self) -> Option<u64> {
        match *self {
            Self::NeverExpires => None,
            Self::TimeToLive { ttl_ms } => Some(ttl_ms),
            Self::TimeToLiveWithIdleTimeout { ttl_ms, .. } => Some(ttl_ms),
            Self::ThrottledUseAndTimeout {
                time_to_kill_ms, ..
            } => Some(time_to_kill_ms),
            Self::MultiUseOrTimeout { ttl_ms, .. } => Some(ttl_ms),
        }
    }

    /// Check the policy parameters.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::InvalidConfiguration` for zero durations or a
    /// zero use count.
    pub fn validate(&self) -> Result<()> {
        let bad = |what: &str| -> Result<()> {
            Err(TicketError::InvalidConfiguration(format!("{what} must be > 0")))
        };
        match *self {
            Self::NeverExpires => Ok(()),
            Self::TimeToLive { ttl_ms } if ttl_ms == 0 => bad("ttl_ms"),
            Self::TimeToLiveWithIdleTimeout { ttl_ms, .. } if ttl_ms == 0 => bad("ttl_ms"),
            Self::TimeToLiveWithIdleTimeout { idle_ms, .. } if idle_ms == 0 => bad("idle_ms"),
            Self::ThrottledUseAndTimeout {
                time_to_kill_ms, ..
            } if time_to_kill_ms == 0 => bad("time_to_kill_ms"),
            Self::ThrottledUseAndTimeout {
                time_in_between_uses_ms,
                ..
            } if time_in_between_uses_ms == 0 => bad("time_in_between_uses_ms"),
            Self::MultiUseOrTimeout { max_uses, .. } if max_uses == 0 => bad("max_uses"),
            Self::MultiUseOrTimeout { ttl_ms, .. } if ttl_ms == 0 => bad("ttl_ms"),
            _ => Ok(()),
        }
    }

    /// Stable name for logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NeverExpires => "never_expires",
            Self::TimeToLive { .. } => "time_to_live",
            Self::TimeToLiveWithIdleTimeout { .. } => "time_to_live_with_idle_timeout",
            Self::ThrottledUseAndTimeout { .. } => "throttled_use_and_timeout",
            Self::MultiUseOrTimeout { .. } => "multi_use_or_timeout",
        }
    }
}

fn throttled_is_expired(
    state: &TicketState,
    now: u64,
    time_to_kill_ms: u64,
    time_in_between_uses_ms: u64,
) -> bool {
    let idle = state.idle_ms(now);

    if state.usage_count == 0 && idle < time_to_kill_ms {
        log::debug!("ticket not expired: never used and within time to kill");
        return false;
    }

    if idle >= time_to_kill_ms {
        log::debug!("ticket expired: {idle}ms since last use exceeds time to kill");
        return true;
    }

    if idle <= time_in_between_uses_ms {
        log::warn!("ticket expired: reused {idle}ms after previous use, inside the throttle window");
        return true;
    }

    false
}
