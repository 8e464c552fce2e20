//! Credentials presented at login.

use std::fmt;

use zeroize::Zeroizing;

/// What a user (or a trusted upstream) presents to prove identity.
#[derive(Clone)]
pub enum Credential {
    /// Interactive username and password.
    UsernamePassword {
        username: String,
        password: Zeroizing<String>,
        remember_me: bool,
    },
    /// A URL the server can call back, used to prove a proxying service.
    Url { url: String },
    /// The network address the request came from.
    RemoteAddress { address: String },
    /// Identity already established by a trusted upstream component.
    PreAuthenticated {
        principal_id: String,
        remember_me: bool,
    },
}

/// Discriminant of [`Credential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    UsernamePassword,
    Url,
    RemoteAddress,
    PreAuthenticated,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UsernamePassword => "username_password",
            Self::Url => "url",
            Self::RemoteAddress => "remote_address",
            Self::PreAuthenticated => "pre_authenticated",
        };
        f.write_str(s)
    }
}

impl Credential {
    /// Username/password credential without remember-me.
    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UsernamePassword {
            username: username.into(),
            password: Zeroizing::new(password.into()),
            remember_me: false,
        }
    }

    /// Callback URL credential.
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }

    /// Remote address credential.
    pub fn remote_address(address: impl Into<String>) -> Self {
        Self::RemoteAddress {
            address: address.into(),
        }
    }

    /// Pre-authenticated credential.
    pub fn pre_authenticated(principal_id: impl Into<String>) -> Self {
        Self::PreAuthenticated {
            principal_id: principal_id.into(),
            remember_me: false,
        }
    }

    /// Ask for a long-term ("remember me") session. Ignored by credential
    /// kinds that cannot carry the flag.
    pub fn with_remember_me(mut self) -> Self {
        match &mut self {
            Self::UsernamePassword { remember_me, .. }
            | Self::PreAuthenticated { remember_me, .. } => *remember_me = true,
            Self::Url { .. } | Self::RemoteAddress { .. } => {}
        }
        self
    }

    /// Did the user ask for a long-term session?
    pub fn remember_me(&self) -> bool {
        match self {
            Self::UsernamePassword { remember_me, .. }
            | Self::PreAuthenticated { remember_me, .. } => *remember_me,
            Self::Url { .. } | Self::RemoteAddress { .. } => false,
        }
    }

    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::UsernamePassword { .. } => CredentialKind::UsernamePassword,
            Self::Url { .. } => CredentialKind::Url,
            Self::RemoteAddress { .. } => CredentialKind::RemoteAddress,
            Self::PreAuthenticated { .. } => CredentialKind::PreAuthenticated,
        }
    }
}

// Passwords never reach Debug output.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernamePassword {
                username,
                remember_me,
                ..
            } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .field("remember_me", remember_me)
                .finish(),
            Self::Url { url } => f.debug_struct("Url").field("url", url).finish(),
            Self::RemoteAddress { address } => f
                .debug_struct("RemoteAddress")
                .field("address", address)
                .finish(),
            Self::PreAuthenticated {
                principal_id,
                remember_me,
            } => f
                .debug_struct("PreAuthenticated")
                .field("principal_id", principal_id)
                .field("remember_me", remember_me)
                .finish(),
        }
    }
}
