//! Tickets: the records a login session is made of.
//!
//! The ticket module provides:
//! - Unguessable ticket ids and their generator
//! - Ticket granting tickets (one per login, or per proxy hop)
//! - Single-use service tickets bound to one service
//! - The assertion returned by a successful validation
//!
//! Tickets reference each other by id only. A service ticket names the
//! granting ticket it came from; a granting ticket lists the ids of its
//! children. There are no live pointers between tickets, so each record
//! can be stored and serialised on its own.

pub mod assertion;
pub mod granting;
pub mod id;
pub mod service;
pub mod service_ticket;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::policy::{ExpirationPolicy, TicketState};

pub use assertion::Assertion;
pub use granting::TicketGrantingTicket;
pub use id::{TicketId, TicketIdGenerator};
pub use service::Service;
pub use service_ticket::ServiceTicket;

/// Ticket kind discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketKind {
    Granting,
    Service,
}

impl TicketKind {
    /// Id prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Granting => "TGT",
            Self::Service => "ST",
        }
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Any stored ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Ticket {
    Granting(TicketGrantingTicket),
    Service(ServiceTicket),
}

impl Ticket {
    pub fn id(&self) -> &TicketId {
        match self {
            Self::Granting(t) => t.id(),
            Self::Service(t) => t.id(),
        }
    }

    pub fn kind(&self) -> TicketKind {
        match self {
            Self::Granting(_) => TicketKind::Granting,
            Self::Service(_) => TicketKind::Service,
        }
    }

    /// The ticket this one hangs off in the cascade tree: a service
    /// ticket's granting ticket, or a proxy granting ticket's parent.
    pub fn parent_id(&self) -> Option<&TicketId> {
        match self {
            Self::Granting(t) => t.parent(),
            Self::Service(t) => Some(t.granting_ticket()),
        }
    }

    /// Terminal flag set: destroyed granting ticket or consumed service
    /// ticket. Policies are not consulted.
    pub fn is_flagged_expired(&self) -> bool {
        match self {
            Self::Granting(t) => t.is_marked_expired(),
            Self::Service(t) => t.is_consumed(),
        }
    }

    pub fn expiration_policy(&self) -> &ExpirationPolicy {
        match self {
            Self::Granting(t) => t.expiration_policy(),
            Self::Service(t) => t.expiration_policy(),
        }
    }

    pub fn state(&self) -> &TicketState {
        match self {
            Self::Granting(t) => t.state(),
            Self::Service(t) => t.state(),
        }
    }

    pub fn into_granting(self) -> Option<TicketGrantingTicket> {
        match self {
            Self::Granting(t) => Some(t),
            Self::Service(_) => None,
        }
    }

    pub fn into_service(self) -> Option<ServiceTicket> {
        match self {
            Self::Service(t) => Some(t),
            Self::Granting(_) => None,
        }
    }
}

impl From<TicketGrantingTicket> for Ticket {
    fn from(t: TicketGrantingTicket) -> Self {
        Self::Granting(t)
    }
}

impl From<ServiceTicket> for Ticket {
    fn from(t: ServiceTicket) -> Self {
        Self::Service(t)
    }
}
