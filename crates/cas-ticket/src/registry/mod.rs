//! Ticket registries: concurrency-safe storage keyed by ticket id.
//!
//! A registry only stores and retrieves. It never evaluates expiration
//! policies; the central service does that with each ticket's embedded
//! policy. The one filtering rule every backend applies is the explicit
//! terminal flag: a ticket flagged expired or consumed reads as absent.
//!
//! # Backends
//!
//! - [`InMemoryTicketRegistry`]: process-local, lock-sharded map.
//! - [`CacheTicketRegistry`]: any [`crate::storage::TicketCache`], which
//!   may be shared by several nodes.

pub mod cache;
pub mod memory;

use crate::error::Result;
use crate::ticket::{ServiceTicket, Ticket, TicketGrantingTicket, TicketId, TicketKind};

pub use cache::CacheTicketRegistry;
pub use memory::InMemoryTicketRegistry;

/// Storage contract for tickets.
pub trait TicketRegistry: Send + Sync {
    /// Insert a new ticket.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::TicketCreationFailed` if the id is already
    /// present. Ids are random, so a collision means broken randomness or
    /// misconfiguration and is never retried.
    fn add_ticket(&self, ticket: Ticket) -> Result<()>;

    /// Fetch a ticket of the expected kind.
    ///
    /// Unknown id, wrong kind and flagged-expired all return `Ok(None)`;
    /// callers cannot tell them apart.
    fn get_ticket(&self, id: &TicketId, kind: TicketKind) -> Result<Option<Ticket>>;

    /// Persist a mutated ticket. A ticket deleted in the meantime is not
    /// resurrected.
    fn update_ticket(&self, ticket: &Ticket) -> Result<()>;

    /// Remove a ticket. Returns whether anything was removed; exactly one
    /// of several concurrent callers observes `true`.
    fn delete_ticket(&self, id: &TicketId) -> Result<bool>;

    /// Ids chained below a granting ticket.
    fn get_children(&self, id: &TicketId) -> Result<Vec<TicketId>>;

    /// Every stored ticket, flagged ones included. Used by sweeps and
    /// operator tooling.
    fn tickets(&self) -> Result<Vec<Ticket>>;

    /// Number of stored tickets.
    fn ticket_count(&self) -> Result<usize> {
        Ok(self.tickets()?.len())
    }

    /// Typed convenience over [`get_ticket`](Self::get_ticket).
    fn get_granting_ticket(&self, id: &TicketId) -> Result<Option<TicketGrantingTicket>> {
        Ok(self
            .get_ticket(id, TicketKind::Granting)?
            .and_then(Ticket::into_granting))
    }

    /// Typed convenience over [`get_ticket`](Self::get_ticket).
    fn get_service_ticket(&self, id: &TicketId) -> Result<Option<ServiceTicket>> {
        Ok(self
            .get_ticket(id, TicketKind::Service)?
            .and_then(Ticket::into_service))
    }
}

/// Apply the read filter shared by every backend.
pub(crate) fn visible(ticket: Ticket, kind: TicketKind) -> Option<Ticket> {
    (ticket.kind() == kind && !ticket.is_flagged_expired()).then_some(ticket)
}
