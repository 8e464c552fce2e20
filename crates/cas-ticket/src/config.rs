//! Ticket engine configuration.
//!
//! Loaded from JSON; every field has a default, so an empty object is a
//! valid configuration. Durations are milliseconds.
//!
//! ```json
//! {
//!   "ticket_granting": { "time_to_live_with_idle_timeout": { "ttl_ms": 28800000, "idle_ms": 7200000 } },
//!   "long_term_ticket_granting": { "time_to_live": { "ttl_ms": 1209600000 } },
//!   "service": { "multi_use_or_timeout": { "max_uses": 1, "ttl_ms": 10000 } },
//!   "id_suffix": "cas_node_1"
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TicketError};
use crate::policy::ExpirationPolicy;
use crate::ticket::id::MIN_RANDOM_BYTES;

const HOUR_MS: u64 = 60 * 60 * 1_000;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Settings for [`crate::CentralAuthenticationService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CasConfig {
    /// Policy for granting tickets from ordinary logins.
    pub ticket_granting: ExpirationPolicy,
    /// Policy for granting tickets from remember-me logins.
    pub long_term_ticket_granting: ExpirationPolicy,
    /// Policy for service tickets.
    pub service: ExpirationPolicy,
    /// Node suffix appended to generated ids.
    pub id_suffix: String,
    /// Random bytes per ticket id.
    pub id_random_bytes: usize,
    /// Maximum number of proxy hops below a login. Zero disables proxying.
    pub max_proxy_depth: u32,
    /// Initial capacity of the per-ticket lock table.
    pub lock_table_hint: usize,
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            ticket_granting: ExpirationPolicy::TimeToLiveWithIdleTimeout {
                ttl_ms: 8 * HOUR_MS,
                idle_ms: 2 * HOUR_MS,
            },
            long_term_ticket_granting: ExpirationPolicy::TimeToLive {
                ttl_ms: 14 * DAY_MS,
            },
            service: ExpirationPolicy::MultiUseOrTimeout {
                max_uses: 1,
                ttl_ms: 10_000,
            },
            id_suffix: "cas".to_string(),
            id_random_bytes: 32,
            max_proxy_depth: 8,
            lock_table_hint: 1_024,
        }
    }
}

impl CasConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::InvalidConfiguration` for malformed JSON,
    /// unknown fields, or values rejected by [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TicketError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::Io` if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Check every setting.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::InvalidConfiguration` naming the first bad
    /// setting.
    pub fn validate(&self) -> Result<()> {
        self.ticket_granting.validate()?;
        self.long_term_ticket_granting.validate()?;
        self.service.validate()?;

        if self.id_suffix.is_empty()
            || !self
                .id_suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        {
            return Err(TicketError::InvalidConfiguration(format!(
                "id_suffix must be non-empty ASCII alphanumerics, '.' or '_', got {:?}",
                self.id_suffix
            )));
        }

        if self.id_random_bytes < MIN_RANDOM_BYTES {
            return Err(TicketError::InvalidConfiguration(format!(
                "id_random_bytes must be at least {MIN_RANDOM_BYTES}"
            )));
        }

        Ok(())
    }

    /// Policy for a new granting ticket.
    pub fn granting_policy(&self, long_term: bool) -> &ExpirationPolicy {
        if long_term {
            &self.long_term_ticket_granting
        } else {
            &self.ticket_granting
        }
    }
}
