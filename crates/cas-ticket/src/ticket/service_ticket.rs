//! Service tickets: short-lived proof for one service.

use serde::{Deserialize, Serialize};

use crate::policy::{ExpirationPolicy, TicketState};

use super::id::TicketId;
use super::service::Service;

/// Proof, presented to one service, that its bearer holds a live login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTicket {
    id: TicketId,
    service: Service,
    granting_ticket: TicketId,
    from_new_login: bool,
    state: TicketState,
    expiration_policy: ExpirationPolicy,
    consumed: bool,
    granted_proxy: bool,
}

impl ServiceTicket {
    pub fn new(
        id: TicketId,
        service: Service,
        granting_ticket: TicketId,
        from_new_login: bool,
        expiration_policy: ExpirationPolicy,
        now: u64,
    ) -> Self {
        Self {
            id,
            service,
            granting_ticket,
            from_new_login,
            state: TicketState::new(now),
            expiration_policy,
            consumed: false,
            granted_proxy: false,
        }
    }

    pub fn id(&self) -> &TicketId {
        &self.id
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Id of the granting ticket this one was minted from.
    pub fn granting_ticket(&self) -> &TicketId {
        &self.granting_ticket
    }

    /// Minted from a fresh credential check rather than a cached session.
    pub fn is_from_new_login(&self) -> bool {
        self.from_new_login
    }

    pub fn state(&self) -> &TicketState {
        &self.state
    }

    pub fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.expiration_policy
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Already used to mint a proxy granting ticket.
    pub fn has_granted_proxy(&self) -> bool {
        self.granted_proxy
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.consumed || self.expiration_policy.is_expired(&self.state, now)
    }

    /// Record one validation at `now`. Returns `true` when this use
    /// exhausted the ticket, which is then flagged consumed.
    pub(crate) fn record_validation(&mut self, now: u64) -> bool {
        self.state.record_use(now);
        if self.expiration_policy.is_expired(&self.state, now) {
            self.consumed = true;
        }
        self.consumed
    }

    /// Test-and-set of the proxy flag. Returns `false` if it was already set.
    pub(crate) fn mark_proxy_granted(&mut self) -> bool {
        !std::mem::replace(&mut self.granted_proxy, true)
    }
}
