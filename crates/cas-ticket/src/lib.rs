//! CasTicket: the ticket lifecycle engine of a single sign-on server.
//!
//! A principal authenticates once and receives a granting ticket. Each
//! service it visits gets a short-lived, normally single-use service
//! ticket minted from that session, and validates it back here to learn
//! who the user is. Destroying the granting ticket signs the user out of
//! everything at once.
//!
//! Tickets live behind a pluggable [`TicketRegistry`], either in process
//! or in a key/value [`TicketCache`] shared between nodes, and expire by
//! the [`ExpirationPolicy`] embedded in each ticket.

pub mod authn;
pub mod cas;
pub mod config;
pub mod crypto;
pub mod error;
pub mod policy;
pub mod registry;
pub mod storage;
pub mod ticket;
pub mod time;

// Re-export primary types
pub use cas::{CentralAuthenticationService, SweepReport};
pub use config::CasConfig;
pub use error::{Result, TicketError};

// Re-export ticket types
pub use ticket::{
    Assertion, Service, ServiceTicket, Ticket, TicketGrantingTicket, TicketId, TicketIdGenerator,
    TicketKind,
};

// Re-export policy types
pub use policy::{ExpirationPolicy, TicketState};

// Re-export authentication types
pub use authn::{
    AuthenticatedPrincipal, Authentication, AuthenticationError, Authenticator,
    AuthenticatorChain, Credential, CredentialKind, PreAuthenticatedAuthenticator, Principal,
    RemoteAddressAuthenticator, SimpleTestAuthenticator,
};

// Re-export storage types
pub use registry::{CacheTicketRegistry, InMemoryTicketRegistry, TicketRegistry};
pub use storage::{DirectoryCache, MemoryCache, TicketCache};
pub use time::{Clock, ManualClock, SystemClock};
