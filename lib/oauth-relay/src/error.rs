//! Error types for the OAuth2 relay.
//!
//! Every popup-side failure ends up as the `error` string of a single
//! `OAUTH2_ERROR` message, so `Display` is written for the person looking
//! at the login modal. Cross-origin messages and abandoned popups are not
//! errors and have no variant here.

use std::fmt;

/// Errors from either half of the popup handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The identity provider redirected back with `error` set.
    ProviderDenied {
        error: String,
        description: Option<String>,
    },
    /// The callback carried no authorization code.
    MissingCode,
    /// The provider could not be recovered from the `state` parameter.
    UnknownProvider,
    /// The echoed `state` does not match the one this console issued.
    StateMismatch,
    /// The callback page is not the registered redirect URI.
    RedirectUriMismatch { expected: String, actual: String },
    /// The backend could not be reached.
    Transport { reason: String },
    /// The backend answered with a non-success status.
    Http { status: u16, message: String },
    /// The backend answered `success: false`.
    Rejected { message: String },
    /// The backend answered with a body the relay cannot use.
    MalformedResponse { reason: String },
    /// The browser refused to open the popup.
    PopupBlocked,
    /// The popup could not post to its opener.
    PostFailed { reason: String },
    /// A URL could not be parsed.
    InvalidUrl { url: String, reason: String },
    /// The pending state could not be stored.
    Storage { reason: String },
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderDenied { error, description } => match description {
                Some(description) => write!(f, "sign-in was denied: {description}"),
                None => write!(f, "sign-in was denied: {error}"),
            },
            Self::MissingCode => write!(f, "no authorization code received"),
            Self::UnknownProvider => write!(f, "unknown OAuth2 provider"),
            Self::StateMismatch => write!(f, "OAuth2 state does not match this sign-in attempt"),
            Self::RedirectUriMismatch { expected, actual } => {
                write!(f, "redirect_uri mismatch: expected {expected}, got {actual}")
            }
            Self::Transport { reason } => write!(f, "could not reach the server: {reason}"),
            Self::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Rejected { message } => write!(f, "{message}"),
            Self::MalformedResponse { reason } => {
                write!(f, "unexpected response from the server: {reason}")
            }
            Self::PopupBlocked => write!(f, "the sign-in popup was blocked"),
            Self::PostFailed { reason } => write!(f, "failed to notify the opener: {reason}"),
            Self::InvalidUrl { url, reason } => write!(f, "invalid URL '{url}': {reason}"),
            Self::Storage { reason } => write!(f, "failed to store sign-in state: {reason}"),
        }
    }
}

impl std::error::Error for RelayError {}
