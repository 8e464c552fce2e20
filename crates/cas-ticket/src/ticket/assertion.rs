//! The result of a successful service ticket validation.

use std::sync::Arc;

use crate::authn::{Authentication, Principal};

use super::service::Service;

/// Read-only outcome of validating a service ticket.
#[derive(Debug, Clone)]
pub struct Assertion {
    chained_authentications: Vec<Arc<Authentication>>,
    service: Service,
    from_new_login: bool,
}

impl Assertion {
    /// `chained_authentications` must be non-empty and ordered from the
    /// original login through each proxy hop.
    pub(crate) fn new(
        chained_authentications: Vec<Arc<Authentication>>,
        service: Service,
        from_new_login: bool,
    ) -> Self {
        debug_assert!(!chained_authentications.is_empty());
        Self {
            chained_authentications,
            service,
            from_new_login,
        }
    }

    /// Authentications from the original login (first) to the last proxy hop.
    pub fn chained_authentications(&self) -> &[Arc<Authentication>] {
        &self.chained_authentications
    }

    /// The original login.
    pub fn primary_authentication(&self) -> &Authentication {
        &self.chained_authentications[0]
    }

    /// Principal of the original login.
    pub fn principal(&self) -> &Principal {
        self.primary_authentication().principal()
    }

    /// Number of proxy hops between the login and the validating service.
    pub fn proxy_hops(&self) -> usize {
        self.chained_authentications.len() - 1
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn is_from_new_login(&self) -> bool {
        self.from_new_login
    }
}
