//! Principals and the immutable authentication record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Multi-valued attribute map.
pub type Attributes = BTreeMap<String, Vec<String>>;

/// An authenticated identity and its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Name, unique within the authenticating realm.
    pub id: String,
    /// Attributes released by the authenticator.
    #[serde(default)]
    pub attributes: Attributes,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Attributes::new(),
        }
    }

    /// Add one attribute value.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }
}

/// Outcome of one successful credential validation.
///
/// Built once and never mutated; tickets share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    principal: Principal,
    authenticated_at_ms: u64,
    metadata: Attributes,
    long_term: bool,
}

impl Authentication {
    pub fn new(
        principal: Principal,
        authenticated_at_ms: u64,
        metadata: Attributes,
        long_term: bool,
    ) -> Self {
        Self {
            principal,
            authenticated_at_ms,
            metadata,
            long_term,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// When the credential was validated (milliseconds since epoch).
    pub fn authenticated_at_ms(&self) -> u64 {
        self.authenticated_at_ms
    }

    /// Method name to values, e.g. which handler accepted the credential.
    pub fn metadata(&self) -> &Attributes {
        &self.metadata
    }

    /// Remember-me login; selects the long-term expiration policy.
    pub fn is_long_term(&self) -> bool {
        self.long_term
    }
}
