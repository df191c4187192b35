//! User domain type and related structures.
//!
//! The User is the identity the console backend returns on login,
//! registration or OAuth2 code exchange. The console never edits it field
//! by field: a profile update or token refresh replaces it wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::role::Role;

/// Opaque user identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user ID from its backend representation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a user authenticates with the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Google OAuth2.
    Google,
    /// GitHub OAuth2.
    Github,
    /// Email and password registered with the platform itself.
    Local,
}

impl AuthProvider {
    /// Returns the wire name of the provider.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authenticated user of the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user ID.
    id: UserId,
    /// Email address.
    email: String,
    /// Display name.
    name: String,
    /// Role within the organisation; drives every permission check.
    role: Role,
    /// Provider the user authenticated with.
    auth_provider: AuthProvider,
    /// The user's ID at the external identity provider, if any.
    #[serde(default)]
    provider_id: Option<String>,
    /// Whether the email address has been verified.
    #[serde(default)]
    is_verified: bool,
    /// When the user record was created.
    created_at: DateTime<Utc>,
    /// When the user record was last updated.
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a locally-registered, unverified user.
    #[must_use]
    pub fn new(id: UserId, email: String, name: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            name,
            role,
            auth_provider: AuthProvider::Local,
            provider_id: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the user as authenticated through an external provider.
    #[must_use]
    pub fn with_provider(mut self, provider: AuthProvider, provider_id: Option<String>) -> Self {
        self.auth_provider = provider;
        self.provider_id = provider_id;
        self
    }

    /// Sets the verification flag.
    #[must_use]
    pub fn verified(mut self, is_verified: bool) -> Self {
        self.is_verified = is_verified;
        self
    }

    /// Sets the record timestamps, for users loaded from a store.
    #[must_use]
    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    /// Returns the backend user ID.
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the user's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the authentication provider.
    #[must_use]
    pub fn auth_provider(&self) -> AuthProvider {
        self.auth_provider
    }

    /// Returns the provider-specific user ID, if any.
    #[must_use]
    pub fn provider_id(&self) -> Option<&str> {
        self.provider_id.as_deref()
    }

    /// Returns true if the email address is verified.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    /// Returns when the user was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the user was last updated.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
