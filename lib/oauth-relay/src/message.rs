//! Messages exchanged between the popup and its opener.

use harbor_platform_access::User;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The payload the popup posts to its opener. Exactly one is posted per
/// handshake attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayMessage {
    /// The code exchange succeeded.
    #[serde(rename = "OAUTH2_SUCCESS")]
    Success {
        user: User,
        #[serde(rename = "accessToken")]
        access_token: String,
    },
    /// Any failure on the popup side.
    #[serde(rename = "OAUTH2_ERROR")]
    Error { error: String },
}

impl RelayMessage {
    /// Creates a success message.
    #[must_use]
    pub fn success(user: User, access_token: impl Into<String>) -> Self {
        Self::Success {
            user,
            access_token: access_token.into(),
        }
    }

    /// Creates an error message.
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Decodes an inbound payload; anything that is not one of the two
    /// message shapes yields `None`.
    #[must_use]
    pub fn from_data(data: &JsonValue) -> Option<Self> {
        Self::deserialize(data).ok()
    }

    /// Returns true for the success shape.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// A cross-window message as the receiving window sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    /// Origin of the sending document, as reported by the browser.
    pub origin: String,
    /// The structured-clone payload.
    pub data: JsonValue,
}
