//! Client-side authentication state.
//!
//! `AuthState` is what the console knows about the signed-in user. It is
//! loaded once from storage at startup and changed only through the
//! `SessionStore` transitions, each of which writes the result back: the
//! record is persisted when a user and token are both present and removed
//! otherwise.

use harbor_core::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::role::Role;
use crate::storage::KeyValueStore;
use crate::user::User;

/// Storage key holding the persisted session record.
pub const AUTH_STORAGE_KEY: &str = "harbor-auth";

/// The console's view of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    user: Option<User>,
    token: Option<String>,
    loading: bool,
    error: Option<String>,
}

impl AuthState {
    /// Returns the signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Returns the access token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns true while a login is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the last error to show the user, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns true if both a user and an access token are present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    /// Returns the signed-in user's role, if any.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(User::role)
    }
}

/// On-storage layout of the session.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    user: User,
    token: String,
}

/// Owns the `AuthState` and keeps storage in step with it.
#[derive(Debug)]
pub struct SessionStore<S> {
    storage: S,
    state: AuthState,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Initialises the session from storage.
    ///
    /// A missing or malformed record yields the signed-out state.
    pub fn load(storage: S) -> Self {
        let state = match storage.get(AUTH_STORAGE_KEY) {
            None => AuthState::default(),
            Some(raw) => match serde_json::from_str::<PersistedSession>(&raw) {
                Ok(persisted) => {
                    debug!(user_id = %persisted.user.id(), "restored persisted session");
                    AuthState {
                        user: Some(persisted.user),
                        token: Some(persisted.token),
                        ..AuthState::default()
                    }
                }
                Err(e) => {
                    warn!(error = %e, "ignoring malformed persisted session");
                    AuthState::default()
                }
            },
        };
        Self { storage, state }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Returns the underlying storage.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Adopts a freshly authenticated user and token.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted. The in-memory
    /// state is updated regardless.
    pub fn login(&mut self, user: User, token: String) -> Result<(), StorageError> {
        debug!(user_id = %user.id(), role = %user.role(), "session established");
        self.state.user = Some(user);
        self.state.token = Some(token);
        self.state.loading = false;
        self.state.error = None;
        self.persist()
    }

    /// Replaces user and token after a token refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn refresh(&mut self, user: User, token: String) -> Result<(), StorageError> {
        self.state.user = Some(user);
        self.state.token = Some(token);
        self.persist()
    }

    /// Replaces the user after a profile update.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn update_user(&mut self, user: User) -> Result<(), StorageError> {
        self.state.user = Some(user);
        self.persist()
    }

    /// Signs the user out.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted record cannot be removed.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        debug!("session cleared");
        self.state = AuthState::default();
        self.persist()
    }

    /// Marks a login as started or finished.
    pub fn set_loading(&mut self, loading: bool) {
        self.state.loading = loading;
        if loading {
            self.state.error = None;
        }
    }

    /// Records a failed login; any existing session is left in place.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.state.loading = false;
        self.state.error = Some(message.into());
    }

    /// Dismisses the last error.
    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    fn persist(&self) -> Result<(), StorageError> {
        match (&self.state.user, &self.state.token) {
            (Some(user), Some(token)) => {
                let raw = serde_json::to_string(&PersistedSessionRef { user, token }).map_err(
                    |e| StorageError::SerializeFailed {
                        reason: e.to_string(),
                    },
                )?;
                self.storage.set(AUTH_STORAGE_KEY, &raw)
            }
            _ => self.storage.remove(AUTH_STORAGE_KEY),
        }
    }
}

#[derive(Serialize)]
struct PersistedSessionRef<'a> {
    user: &'a User,
    token: &'a str,
}
