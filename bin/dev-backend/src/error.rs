//! Error types for the dev backend.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use harbor_oauth_relay::AuthResponse;
use std::fmt;

/// Errors returned by the OAuth2 endpoints.
///
/// Every variant is rendered as a `{ success: false, message }` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The path names a provider this backend does not know.
    UnknownProvider { provider: String },
    /// The request's redirect URI is not the registered one.
    RedirectUriMismatch,
    /// The request body could not be read.
    InvalidRequest { reason: String },
    /// The code exchange request carried an empty code.
    MissingCode,
    /// The code was refused.
    Denied,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProvider { provider } => write!(f, "unknown provider '{provider}'"),
            Self::RedirectUriMismatch => write!(f, "redirect_uri mismatch"),
            Self::InvalidRequest { reason } => write!(f, "invalid request: {reason}"),
            Self::MissingCode => write!(f, "missing authorization code"),
            Self::Denied => write!(f, "authorization code was rejected"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownProvider { .. } => StatusCode::NOT_FOUND,
            Self::RedirectUriMismatch | Self::InvalidRequest { .. } | Self::MissingCode => {
                StatusCode::BAD_REQUEST
            }
            Self::Denied => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "request rejected");
        (self.status(), Json(AuthResponse::rejected(self.to_string()))).into_response()
    }
}

/// Errors that stop the dev backend from serving.
#[derive(Debug)]
pub enum DevBackendError {
    /// Configuration could not be loaded.
    Config { reason: String },
    /// A configured URL is invalid.
    InvalidUrl { url: String, reason: String },
    /// The listen address could not be bound.
    Bind { addr: String, reason: String },
    /// The server stopped with an I/O error.
    Serve { reason: String },
}

impl fmt::Display for DevBackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "configuration error: {reason}"),
            Self::InvalidUrl { url, reason } => write!(f, "invalid URL '{url}': {reason}"),
            Self::Bind { addr, reason } => write!(f, "failed to bind {addr}: {reason}"),
            Self::Serve { reason } => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for DevBackendError {}
