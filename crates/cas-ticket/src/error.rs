//! Error types for the ticket engine.
//!
//! Every failure a caller can observe is one of these variants. Ticket
//! failures are deliberately uniform: an unknown, expired, consumed or
//! mismatched ticket all surface as [`TicketError::InvalidTicket`] so the
//! error never tells a caller which of those it was.

/// Ticket engine error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid ticket")]
    InvalidTicket,

    #[error("Ticket creation failed: {0}")]
    TicketCreationFailed(String),

    #[error("Renewal credential did not match the existing authentication")]
    RenewalAuthenticationMismatch,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TicketError {
    /// Collapse a storage-side failure raised while persisting a new ticket
    /// into [`TicketError::TicketCreationFailed`].
    ///
    /// Errors that already carry caller meaning pass through unchanged.
    pub(crate) fn into_creation_failure(self) -> Self {
        match self {
            Self::Storage(msg) | Self::Serialization(msg) => Self::TicketCreationFailed(msg),
            Self::Io(e) => Self::TicketCreationFailed(e.to_string()),
            other => other,
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, TicketError>;
