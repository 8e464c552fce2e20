//! Authentication seam: credentials in, principals out.
//!
//! The ticket engine never checks a password itself. It hands a
//! [`Credential`] to an [`Authenticator`] and, on success, records the
//! resulting [`Principal`] in an immutable [`Authentication`] that every
//! ticket of the login session shares.

pub mod authenticator;
pub mod credential;
pub mod principal;

pub use authenticator::{
    AuthenticatedPrincipal, AuthenticationError, Authenticator, AuthenticatorChain,
    PreAuthenticatedAuthenticator, RemoteAddressAuthenticator, SimpleTestAuthenticator,
    AUTHENTICATION_METHOD,
};
pub use credential::{Credential, CredentialKind};
pub use principal::{Attributes, Authentication, Principal};
