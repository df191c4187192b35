//! Third-party identity providers.

use harbor_platform_access::AuthProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RelayError;

/// An identity provider the console can sign in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    /// Every supported provider.
    pub const ALL: [OAuthProvider; 2] = [OAuthProvider::Google, OAuthProvider::Github];

    /// Returns the name used in URLs, `state` and request bodies.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str() == s)
            .ok_or(RelayError::UnknownProvider)
    }
}

impl From<OAuthProvider> for AuthProvider {
    fn from(provider: OAuthProvider) -> Self {
        match provider {
            OAuthProvider::Google => AuthProvider::Google,
            OAuthProvider::Github => AuthProvider::Github,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_exact() {
        assert_eq!("github".parse::<OAuthProvider>(), Ok(OAuthProvider::Github));
        assert_eq!("google".parse::<OAuthProvider>(), Ok(OAuthProvider::Google));
        assert_eq!(
            "GitHub".parse::<OAuthProvider>(),
            Err(RelayError::UnknownProvider)
        );
        assert!("local".parse::<OAuthProvider>().is_err());
    }

    #[test]
    fn maps_onto_user_auth_provider() {
        assert_eq!(AuthProvider::from(OAuthProvider::Github), AuthProvider::Github);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&OAuthProvider::Google).expect("serialize"),
            "\"google\""
        );
    }
}
