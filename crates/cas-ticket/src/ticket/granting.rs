//! Ticket granting tickets: one completed login session.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::authn::Authentication;
use crate::policy::{ExpirationPolicy, TicketState};

use super::id::TicketId;

/// Proof of one completed login, used to mint service tickets without
/// asking for credentials again.
///
/// A granting ticket obtained through a proxy hop records the granting
/// ticket above it in `parent`; those links form a tree whose depth is
/// bounded when the ticket is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketGrantingTicket {
    id: TicketId,
    authentication: Arc<Authentication>,
    state: TicketState,
    expiration_policy: ExpirationPolicy,
    expired: bool,
    children: BTreeSet<TicketId>,
    parent: Option<TicketId>,
    proxied_by: Option<String>,
    proxy_depth: u32,
}

impl TicketGrantingTicket {
    /// A granting ticket for a direct login at `now`.
    pub fn new(
        id: TicketId,
        authentication: Arc<Authentication>,
        expiration_policy: ExpirationPolicy,
        now: u64,
    ) -> Self {
        Self {
            id,
            authentication,
            state: TicketState::new(now),
            expiration_policy,
            expired: false,
            children: BTreeSet::new(),
            parent: None,
            proxied_by: None,
            proxy_depth: 0,
        }
    }

    /// A proxy granting ticket hanging off `parent`.
    pub fn new_proxy(
        id: TicketId,
        authentication: Arc<Authentication>,
        expiration_policy: ExpirationPolicy,
        parent: &TicketGrantingTicket,
        proxied_by: Option<String>,
        now: u64,
    ) -> Self {
        Self {
            parent: Some(parent.id.clone()),
            proxied_by,
            proxy_depth: parent.proxy_depth.saturating_add(1),
            ..Self::new(id, authentication, expiration_policy, now)
        }
    }

    pub fn id(&self) -> &TicketId {
        &self.id
    }

    pub fn authentication(&self) -> &Arc<Authentication> {
        &self.authentication
    }

    pub fn state(&self) -> &TicketState {
        &self.state
    }

    pub fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.expiration_policy
    }

    /// Ids of service tickets and proxy granting tickets minted from this one.
    pub fn children(&self) -> &BTreeSet<TicketId> {
        &self.children
    }

    /// Granting ticket above this one, for proxy granting tickets.
    pub fn parent(&self) -> Option<&TicketId> {
        self.parent.as_ref()
    }

    /// Callback URL of the proxy that obtained this ticket.
    pub fn proxied_by(&self) -> Option<&str> {
        self.proxied_by.as_deref()
    }

    /// Number of proxy hops between this ticket and the original login.
    pub fn proxy_depth(&self) -> u32 {
        self.proxy_depth
    }

    /// Explicit terminal flag.
    pub fn is_marked_expired(&self) -> bool {
        self.expired
    }

    /// Usable check at `now`: not destroyed and the policy still allows it.
    /// Always evaluated fresh, never cached.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expired || self.expiration_policy.is_expired(&self.state, now)
    }

    pub(crate) fn mark_expired(&mut self) {
        self.expired = true;
    }

    pub(crate) fn record_use(&mut self, now: u64) {
        self.state.record_use(now);
    }

    pub(crate) fn add_child(&mut self, child: TicketId) {
        self.children.insert(child);
    }

    pub(crate) fn remove_child(&mut self, child: &TicketId) -> bool {
        self.children.remove(child)
    }
}
