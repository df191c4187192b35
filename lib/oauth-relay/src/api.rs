//! Client for the backend's OAuth2 endpoints.
//!
//! The relay consumes exactly two endpoints:
//! - `GET  /api/v1/auth/oauth2/{provider}/url?redirect_uri=...` → `{ auth_url }`
//! - `POST /api/v1/auth/oauth2/login` with `{ provider, code, redirect_uri }`
//!   → `{ success, user?, access_token?, message? }`
//!
//! Requests are made once; failures are reported, never retried.

use async_trait::async_trait;
use harbor_platform_access::User;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::provider::OAuthProvider;

/// Body of the authorization URL response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Body of the code exchange request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2LoginRequest {
    pub provider: OAuthProvider,
    pub code: String,
    pub redirect_uri: String,
}

impl fmt::Debug for OAuth2LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2LoginRequest")
            .field("provider", &self.provider)
            .field("code", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Body of the code exchange response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AuthResponse {
    /// A successful response.
    #[must_use]
    pub fn succeeded(user: User, access_token: String) -> Self {
        Self {
            success: true,
            user: Some(user),
            access_token: Some(access_token),
            message: None,
        }
    }

    /// A `success: false` response.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            user: None,
            access_token: None,
            message: Some(message.into()),
        }
    }

    /// Interprets the body.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` for `success: false` and `MalformedResponse` if a
    /// successful body lacks the user or the token.
    pub fn into_login(self) -> Result<LoginSuccess, RelayError> {
        if !self.success {
            return Err(RelayError::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "sign-in was rejected".to_string()),
            });
        }
        match (self.user, self.access_token) {
            (Some(user), Some(access_token)) => Ok(LoginSuccess { user, access_token }),
            (None, _) => Err(RelayError::MalformedResponse {
                reason: "missing user".to_string(),
            }),
            (_, None) => Err(RelayError::MalformedResponse {
                reason: "missing access_token".to_string(),
            }),
        }
    }
}

/// The identity a successful exchange yields.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub user: User,
    pub access_token: String,
}

impl fmt::Debug for LoginSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginSuccess")
            .field("user", &self.user.id())
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// The backend operations the relay depends on.
///
/// This abstraction allows running the handshake without a live backend.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Fetches the provider authorization URL for a redirect URI.
    async fn authorization_url(
        &self,
        provider: OAuthProvider,
        redirect_uri: &str,
    ) -> Result<Url, RelayError>;

    /// Exchanges an authorization code for a user and access token.
    async fn oauth2_login(&self, request: &OAuth2LoginRequest) -> Result<LoginSuccess, RelayError>;
}

#[async_trait]
impl<T: AuthApi + ?Sized> AuthApi for std::sync::Arc<T> {
    async fn authorization_url(
        &self,
        provider: OAuthProvider,
        redirect_uri: &str,
    ) -> Result<Url, RelayError> {
        (**self).authorization_url(provider, redirect_uri).await
    }

    async fn oauth2_login(&self, request: &OAuth2LoginRequest) -> Result<LoginSuccess, RelayError> {
        (**self).oauth2_login(request).await
    }
}

/// `AuthApi` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpAuthApi {
    /// Creates a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, Report<RelayError>> {
        Ok(Self::with_client(reqwest::Client::new(), parse_base(base_url)?))
    }

    /// Creates a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the configured base URL is not absolute.
    pub fn from_config(config: &RelayConfig) -> Result<Self, Report<RelayError>> {
        Self::new(config.api_base_url())
    }

    /// Creates a client with a preconfigured `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self {
            client,
            base_url: with_trailing_slash(base_url),
        }
    }

    /// Returns the backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RelayError> {
        self.base_url
            .join(path)
            .map_err(|e| RelayError::InvalidUrl {
                url: path.to_string(),
                reason: e.to_string(),
            })
    }
}

fn parse_base(base_url: &str) -> Result<Url, RelayError> {
    Url::parse(base_url).map_err(|e| RelayError::InvalidUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn transport(e: reqwest::Error) -> RelayError {
    RelayError::Transport {
        reason: e.to_string(),
    }
}

/// Turns a non-success response into `Http`, using the body's `message`
/// when the backend sent one.
async fn http_error(response: reqwest::Response) -> RelayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AuthResponse>(&body)
        .ok()
        .and_then(|r| r.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    RelayError::Http {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[instrument(skip_all, fields(provider = %provider))]
    async fn authorization_url(
        &self,
        provider: OAuthProvider,
        redirect_uri: &str,
    ) -> Result<Url, RelayError> {
        let mut url = self.endpoint(&format!("api/v1/auth/oauth2/{provider}/url"))?;
        url.query_pairs_mut().append_pair("redirect_uri", redirect_uri);

        let response = self.client.get(url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            let err = http_error(response).await;
            warn!(error = %err, "authorization URL request failed");
            return Err(err);
        }

        let body: AuthUrlResponse =
            response
                .json()
                .await
                .map_err(|e| RelayError::MalformedResponse {
                    reason: e.to_string(),
                })?;
        debug!("received authorization URL");

        Url::parse(&body.auth_url).map_err(|e| RelayError::InvalidUrl {
            url: body.auth_url.clone(),
            reason: e.to_string(),
        })
    }

    #[instrument(skip_all, fields(provider = %request.provider))]
    async fn oauth2_login(&self, request: &OAuth2LoginRequest) -> Result<LoginSuccess, RelayError> {
        let url = self.endpoint("api/v1/auth/oauth2/login")?;

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        if !response.status().is_success() {
            let err = http_error(response).await;
            warn!(error = %err, "code exchange failed");
            return Err(err);
        }

        let body: AuthResponse =
            response
                .json()
                .await
                .map_err(|e| RelayError::MalformedResponse {
                    reason: e.to_string(),
                })?;
        let login = body.into_login()?;
        debug!(user_id = %login.user.id(), "code exchange succeeded");
        Ok(login)
    }
}
