//! Local development backend for the Harbor console.
//!
//! Serves the two endpoints the OAuth2 popup relay consumes, so the console
//! can be signed into without a live identity provider:
//!
//! - `GET  /api/v1/auth/oauth2/{provider}/url?redirect_uri=...`
//! - `POST /api/v1/auth/oauth2/login`
//!
//! Authorization URLs point at the real provider endpoints (or configured
//! overrides). Any authorization code is accepted except those starting
//! with `denied`, and yields the provider's fixture user.

pub mod config;
pub mod error;
pub mod routes;

pub use config::{DevBackendConfig, ProviderConfig};
pub use error::{ApiError, DevBackendError};

use axum::{
    Router,
    routing::{get, post},
};
use harbor_oauth_relay::OAuthProvider;
use harbor_platform_access::{User, UserId};
use oauth2::{AuthUrl, ClientId, EndpointSet, RedirectUrl, basic::BasicClient};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// OAuth2 client that can build authorization URLs.
type AuthorizeClient = BasicClient<EndpointSet>;

/// Shared application state.
pub struct AppState {
    config: DevBackendConfig,
    google: AuthorizeClient,
    github: AuthorizeClient,
}

impl AppState {
    /// Creates the state, building one OAuth2 client per provider.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if an authorization endpoint or the redirect URI
    /// is not a valid URL.
    pub fn new(config: DevBackendConfig) -> Result<Self, DevBackendError> {
        let google = authorize_client(&config, OAuthProvider::Google)?;
        let github = authorize_client(&config, OAuthProvider::Github)?;
        Ok(Self {
            config,
            google,
            github,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DevBackendConfig {
        &self.config
    }

    fn client(&self, provider: OAuthProvider) -> &AuthorizeClient {
        match provider {
            OAuthProvider::Google => &self.google,
            OAuthProvider::Github => &self.github,
        }
    }

    /// The user every successful `provider` sign-in yields.
    #[must_use]
    pub fn fixture_user(&self, provider: OAuthProvider) -> User {
        let name = provider.as_str();
        User::new(
            UserId::new(format!("usr_dev_{name}")),
            format!("dev+{name}@harbor.local"),
            format!("Dev User ({name})"),
            self.config.fixture_role,
        )
        .with_provider(provider.into(), Some(format!("dev-{name}")))
        .verified(true)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn authorize_client(
    config: &DevBackendConfig,
    provider: OAuthProvider,
) -> Result<AuthorizeClient, DevBackendError> {
    let auth_url = config.auth_url(provider);
    let auth_url = AuthUrl::new(auth_url.to_string()).map_err(|e| DevBackendError::InvalidUrl {
        url: auth_url.to_string(),
        reason: e.to_string(),
    })?;
    let redirect_url =
        RedirectUrl::new(config.redirect_uri.clone()).map_err(|e| DevBackendError::InvalidUrl {
            url: config.redirect_uri.clone(),
            reason: e.to_string(),
        })?;

    Ok(
        BasicClient::new(ClientId::new(config.provider(provider).client_id.clone()))
            .set_auth_uri(auth_url)
            .set_redirect_uri(redirect_url),
    )
}

/// Builds the router with request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/auth/oauth2/{provider}/url",
            get(routes::authorization_url),
        )
        .route("/api/v1/auth/oauth2/login", post(routes::oauth2_login))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_platform_access::{AuthProvider, Role};

    #[test]
    fn invalid_redirect_uri_fails_startup() {
        let config = DevBackendConfig {
            redirect_uri: "not a url".to_string(),
            ..DevBackendConfig::default()
        };
        assert!(matches!(
            AppState::new(config),
            Err(DevBackendError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn fixture_users_are_per_provider() {
        let state = AppState::new(DevBackendConfig::default()).expect("state");
        let google = state.fixture_user(OAuthProvider::Google);
        let github = state.fixture_user(OAuthProvider::Github);

        assert_ne!(google.id(), github.id());
        assert_eq!(github.auth_provider(), AuthProvider::Github);
        assert_eq!(github.email(), "dev+github@harbor.local");
        assert_eq!(github.role(), Role::Developer);
    }
}
