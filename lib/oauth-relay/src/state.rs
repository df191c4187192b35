//! The OAuth2 `state` parameter.
//!
//! `state` carries two things across the provider redirect: which provider
//! the popup is talking to, and a single-use nonce that ties the callback
//! to the sign-in attempt that started it. The canonical form is
//! `provider=<name>&nonce=<random>`; nothing else is accepted.

use harbor_core::Result;
use harbor_platform_access::{KeyValueStore, StorageError};
use oauth2::CsrfToken;
use tracing::warn;
use url::Url;

use crate::provider::OAuthProvider;

/// Storage key holding the state of the sign-in attempt in progress.
pub const PENDING_STATE_KEY: &str = "harbor-oauth2-pending";

const PROVIDER_MARKER: &str = "provider=";

/// A decoded `state` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    provider: OAuthProvider,
    nonce: String,
}

impl OAuthState {
    /// Creates a state with a fresh random nonce.
    #[must_use]
    pub fn mint(provider: OAuthProvider) -> Self {
        Self {
            provider,
            nonce: CsrfToken::new_random().secret().clone(),
        }
    }

    /// Creates a state with a known nonce.
    #[must_use]
    pub fn new(provider: OAuthProvider, nonce: impl Into<String>) -> Self {
        Self {
            provider,
            nonce: nonce.into(),
        }
    }

    /// Returns the provider.
    #[must_use]
    pub fn provider(&self) -> OAuthProvider {
        self.provider
    }

    /// Returns the nonce.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Encodes the state in its canonical wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{PROVIDER_MARKER}{}&nonce={}", self.provider, self.nonce)
    }

    /// Records this state as the attempt in progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub fn store_pending(&self, storage: &impl KeyValueStore) -> Result<(), StorageError> {
        storage.set(PENDING_STATE_KEY, &self.encode())
    }

    /// Removes and returns the pending state. A second call returns `None`.
    pub fn take_pending(storage: &impl KeyValueStore) -> Option<String> {
        let pending = storage.get(PENDING_STATE_KEY)?;
        if let Err(e) = storage.remove(PENDING_STATE_KEY) {
            warn!(error = %e, "failed to clear pending OAuth2 state");
        }
        Some(pending)
    }
}

/// Recovers the provider from a `state` value.
///
/// Takes whatever follows the literal `provider=` up to the next `&`.
/// A missing marker or an unrecognised name yields `None`.
#[must_use]
pub fn provider_from_state(state: &str) -> Option<OAuthProvider> {
    let (_, rest) = state.split_once(PROVIDER_MARKER)?;
    let name = rest.split('&').next().unwrap_or_default();
    name.parse().ok()
}

/// Returns `url` with its `state` query parameter replaced.
///
/// Every other parameter keeps its value and relative order.
#[must_use]
pub fn with_state(url: &Url, state: &str) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "state")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut rewritten = url.clone();
    rewritten
        .query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("state", state);
    rewritten
}
