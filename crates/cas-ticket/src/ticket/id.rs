//! Ticket ids and their generator.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::crypto::{fingerprint, random};

use super::TicketKind;

/// Smallest accepted amount of entropy per id, in bytes.
pub const MIN_RANDOM_BYTES: usize = 16;

/// Opaque ticket identifier.
///
/// Format: `{TGT|ST}-{counter}-{base58 random}-{suffix}`. The random part
/// makes ids unguessable; the counter and suffix only help operators.
/// Treat an id as a bearer secret: log [`TicketId::fingerprint`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketId(pub String);

impl TicketId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short, log-safe digest of the id.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }

    /// Kind suggested by the id prefix. Informational only; access
    /// decisions always use the stored ticket's real kind.
    pub fn kind_hint(&self) -> Option<TicketKind> {
        let prefix = self.0.split('-').next()?;
        [TicketKind::Granting, TicketKind::Service]
            .into_iter()
            .find(|k| k.prefix() == prefix)
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TicketId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TicketId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Produces unique, unguessable ticket ids.
#[derive(Debug)]
pub struct TicketIdGenerator {
    counter: AtomicU64,
    suffix: String,
    random_bytes: usize,
}

impl TicketIdGenerator {
    /// Create a generator. `random_bytes` is raised to
    /// [`MIN_RANDOM_BYTES`] if smaller.
    pub fn new(suffix: impl Into<String>, random_bytes: usize) -> Self {
        Self {
            counter: AtomicU64::new(1),
            suffix: suffix.into(),
            random_bytes: random_bytes.max(MIN_RANDOM_BYTES),
        }
    }

    /// Next id for a ticket of `kind`.
    pub fn next_id(&self, kind: TicketKind) -> TicketId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        TicketId(format!(
            "{}-{}-{}-{}",
            kind.prefix(),
            n,
            random::random_token(self.random_bytes),
            self.suffix
        ))
    }
}
