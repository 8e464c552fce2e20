//! Expiration policies: pure decisions about whether a ticket is still usable.
//!
//! The policy module provides:
//! - [`TicketState`], the usage bookkeeping every ticket carries
//! - [`ExpirationPolicy`], the tagged set of pluggable policies
//!
//! Policies never mutate state and never read the clock themselves; the
//! caller passes the current time so a decision is a pure function of
//! `(state, now)` and can be evaluated concurrently on shared tickets.

pub mod expiration;
pub mod state;

pub use expiration::ExpirationPolicy;
pub use state::TicketState;
