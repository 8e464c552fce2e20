//! Ticket lifecycle orchestration.
//!
//! [`CentralAuthenticationService`] ties an [`crate::Authenticator`] to a
//! [`crate::TicketRegistry`] and owns every state transition:
//!
//! ```text
//! granting ticket:  Active ──(destroy | found expired)──▶ Destroyed
//! service ticket:   Active ──(validate)──▶ Consumed
//!                   Active ──(parent destroyed)──▶ Destroyed
//! ```

mod central;
mod locks;

pub use central::{CentralAuthenticationService, SweepReport};
