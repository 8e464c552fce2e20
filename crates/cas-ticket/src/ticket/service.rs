//! Target services that service tickets are bound to.

use serde::{Deserialize, Serialize};

/// A relying service, identified by URL or logical id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Service {
    id: String,
}

impl Service {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Does a presented service identifier name this service?
    ///
    /// Comparison is exact after dropping any URL fragment and a single
    /// trailing slash; nothing else is normalised.
    pub fn matches(&self, presented: &str) -> bool {
        normalize(&self.id) == normalize(presented)
    }
}

fn normalize(id: &str) -> &str {
    let id = id.split('#').next().unwrap_or(id);
    id.strip_suffix('/').unwrap_or(id)
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
