//! The authentication capability and a few small implementations.
//!
//! Real deployments plug in their own [`Authenticator`] (directory bind,
//! password store, federated identity). The implementations here cover
//! the trust-the-caller cases and composition.

use std::net::IpAddr;

use super::credential::{Credential, CredentialKind};
use super::principal::{Attributes, Principal};

/// Metadata key recording which authenticator accepted a credential.
pub const AUTHENTICATION_METHOD: &str = "authenticationMethod";

/// Why a credential was rejected.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Bad credentials")]
    BadCredentials,

    #[error("Unsupported credential kind: {0}")]
    Unsupported(CredentialKind),

    #[error("Authentication backend unavailable: {0}")]
    Unavailable(String),
}

/// What an authenticator returns for a valid credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    pub principal: Principal,
    pub metadata: Attributes,
    /// Long-term ("remember me") session requested and allowed.
    pub long_term: bool,
}

impl AuthenticatedPrincipal {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            metadata: Attributes::new(),
            long_term: false,
        }
    }
}

/// Validates a credential and resolves it to a principal.
///
/// Implementations may block on network I/O. The ticket service never holds
/// a ticket lock while calling them.
pub trait Authenticator: Send + Sync {
    /// Can this authenticator judge `credential` at all?
    fn supports(&self, credential: &Credential) -> bool {
        let _ = credential;
        true
    }

    /// Validate `credential`.
    fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<AuthenticatedPrincipal, AuthenticationError>;
}

// ── RemoteAddressAuthenticator ───────────────────────────────────────────────

/// Trusts requests arriving from configured networks.
///
/// The principal id is the remote address itself. Prefixes are matched
/// against the canonical textual form of the parsed address, so
/// `"10.1."` trusts `10.1.0.0/16`.
#[derive(Debug, Clone, Default)]
pub struct RemoteAddressAuthenticator {
    trusted_prefixes: Vec<String>,
}

impl RemoteAddressAuthenticator {
    pub fn new<I, S>(trusted_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trusted_prefixes: trusted_prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Authenticator for RemoteAddressAuthenticator {
    fn supports(&self, credential: &Credential) -> bool {
        credential.kind() == CredentialKind::RemoteAddress
    }

    fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<AuthenticatedPrincipal, AuthenticationError> {
        let Credential::RemoteAddress { address } = credential else {
            return Err(AuthenticationError::Unsupported(credential.kind()));
        };

        let parsed: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| AuthenticationError::BadCredentials)?;
        let canonical = parsed.to_string();

        if self
            .trusted_prefixes
            .iter()
            .any(|prefix| canonical.starts_with(prefix.as_str()))
        {
            Ok(AuthenticatedPrincipal::new(Principal::new(canonical)))
        } else {
            log::debug!("remote address {canonical} is not in a trusted network");
            Err(AuthenticationError::BadCredentials)
        }
    }
}

// ── PreAuthenticatedAuthenticator ────────────────────────────────────────────

/// Accepts identities asserted by a trusted upstream component.
///
/// Only wire this up behind something that has already authenticated the
/// user (a terminating proxy, a client-certificate check).
#[derive(Debug, Clone, Copy, Default)]
pub struct PreAuthenticatedAuthenticator;

impl Authenticator for PreAuthenticatedAuthenticator {
    fn supports(&self, credential: &Credential) -> bool {
        credential.kind() == CredentialKind::PreAuthenticated
    }

    fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<AuthenticatedPrincipal, AuthenticationError> {
        match credential {
            Credential::PreAuthenticated { principal_id, .. }
                if !principal_id.trim().is_empty() =>
            {
                Ok(AuthenticatedPrincipal::new(Principal::new(
                    principal_id.trim(),
                )))
            }
            Credential::PreAuthenticated { .. } => Err(AuthenticationError::BadCredentials),
            other => Err(AuthenticationError::Unsupported(other.kind())),
        }
    }
}

// ── SimpleTestAuthenticator ──────────────────────────────────────────────────

/// Accepts a username/password pair when both are equal, and any callback
/// URL using `https`.
///
/// For demos and tests only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTestAuthenticator;

impl Authenticator for SimpleTestAuthenticator {
    fn supports(&self, credential: &Credential) -> bool {
        matches!(
            credential.kind(),
            CredentialKind::UsernamePassword | CredentialKind::Url
        )
    }

    fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<AuthenticatedPrincipal, AuthenticationError> {
        match credential {
            Credential::UsernamePassword {
                username, password, ..
            } if !username.is_empty() && username.as_str() == password.as_str() => {
                Ok(AuthenticatedPrincipal::new(Principal::new(username.clone())))
            }
            Credential::Url { url } if url.starts_with("https://") => {
                Ok(AuthenticatedPrincipal::new(Principal::new(url.clone())))
            }
            Credential::UsernamePassword { .. } | Credential::Url { .. } => {
                Err(AuthenticationError::BadCredentials)
            }
            other => Err(AuthenticationError::Unsupported(other.kind())),
        }
    }
}

// ── AuthenticatorChain ───────────────────────────────────────────────────────

/// Tries authenticators in order; the first one that supports the
/// credential decides.
///
/// The chain records the accepting method under [`AUTHENTICATION_METHOD`]
/// and honours the credential's remember-me flag.
#[derive(Default)]
pub struct AuthenticatorChain {
    entries: Vec<(String, Box<dyn Authenticator>)>,
}

impl AuthenticatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an authenticator under a method name.
    pub fn with(
        mut self,
        method: impl Into<String>,
        authenticator: impl Authenticator + 'static,
    ) -> Self {
        self.entries.push((method.into(), Box::new(authenticator)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Authenticator for AuthenticatorChain {
    fn supports(&self, credential: &Credential) -> bool {
        self.entries.iter().any(|(_, a)| a.supports(credential))
    }

    fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<AuthenticatedPrincipal, AuthenticationError> {
        let (method, authenticator) = self
            .entries
            .iter()
            .find(|(_, a)| a.supports(credential))
            .ok_or(AuthenticationError::Unsupported(credential.kind()))?;

        let mut result = authenticator.authenticate(credential)?;
        result
            .metadata
            .entry(AUTHENTICATION_METHOD.to_string())
            .or_default()
            .push(method.clone());
        result.long_term |= credential.remember_me();
        Ok(result)
    }
}
