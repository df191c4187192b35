//! Dev backend configuration.
//!
//! Loaded via the `config` crate from `HARBOR_DEV__*` environment variables.
//! Every field has a default, so the backend starts with no configuration at
//! all and accepts the console's default redirect URI.

use harbor_oauth_relay::OAuthProvider;
use harbor_platform_access::Role;
use serde::Deserialize;
use std::net::SocketAddr;

/// Google's authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// GitHub's authorization endpoint.
pub const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";

/// Dev backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DevBackendConfig {
    /// Address to listen on.
    /// Default: 127.0.0.1:8080
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// The only redirect URI this backend accepts, compared exactly.
    /// Default: http://localhost:3000/auth/callback
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Google client registration.
    #[serde(default)]
    pub google: ProviderConfig,

    /// GitHub client registration.
    #[serde(default)]
    pub github: ProviderConfig,

    /// Role given to every signed-in fixture user.
    /// Default: developer
    #[serde(default = "default_fixture_role")]
    pub fixture_role: Role,
}

/// One identity provider registration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// OAuth2 client ID.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Authorization endpoint override. Unset means the provider's real
    /// endpoint.
    #[serde(default)]
    pub auth_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            auth_url: None,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/auth/callback".to_string()
}

fn default_client_id() -> String {
    "harbor-console-dev".to_string()
}

fn default_fixture_role() -> Role {
    Role::Developer
}

impl Default for DevBackendConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            redirect_uri: default_redirect_uri(),
            google: ProviderConfig::default(),
            github: ProviderConfig::default(),
            fixture_role: default_fixture_role(),
        }
    }
}

impl DevBackendConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("HARBOR_DEV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the registration for `provider`.
    #[must_use]
    pub fn provider(&self, provider: OAuthProvider) -> &ProviderConfig {
        match provider {
            OAuthProvider::Google => &self.google,
            OAuthProvider::Github => &self.github,
        }
    }

    /// Returns the authorization endpoint for `provider`.
    #[must_use]
    pub fn auth_url(&self, provider: OAuthProvider) -> &str {
        self.provider(provider)
            .auth_url
            .as_deref()
            .unwrap_or(match provider {
                OAuthProvider::Google => GOOGLE_AUTH_URL,
                OAuthProvider::Github => GITHUB_AUTH_URL,
            })
    }
}

/// Scopes requested from `provider`.
#[must_use]
pub fn scopes(provider: OAuthProvider) -> &'static [&'static str] {
    match provider {
        OAuthProvider::Google => &["openid", "email", "profile"],
        OAuthProvider::Github => &["read:user", "user:email"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_uses_defaults() {
        let config: DevBackendConfig = config::Config::builder()
            .build()
            .expect("build config")
            .try_deserialize()
            .expect("deserialize");

        assert_eq!(config.listen_addr, default_listen_addr());
        assert_eq!(config.redirect_uri, "http://localhost:3000/auth/callback");
        assert_eq!(config.fixture_role, Role::Developer);
        assert_eq!(config.auth_url(OAuthProvider::Google), GOOGLE_AUTH_URL);
        assert_eq!(config.auth_url(OAuthProvider::Github), GITHUB_AUTH_URL);
    }

    #[test]
    fn nested_overrides() {
        let config: DevBackendConfig = config::Config::builder()
            .set_override("listen_addr", "0.0.0.0:9000")
            .expect("override")
            .set_override("github.client_id", "gh-123")
            .expect("override")
            .set_override("google.auth_url", "http://127.0.0.1:9999/authorize")
            .expect("override")
            .set_override("fixture_role", "owner")
            .expect("override")
            .build()
            .expect("build config")
            .try_deserialize()
            .expect("deserialize");

        assert_eq!(config.listen_addr, SocketAddr::from(([0, 0, 0, 0], 9000)));
        assert_eq!(config.provider(OAuthProvider::Github).client_id, "gh-123");
        assert_eq!(
            config.provider(OAuthProvider::Google).client_id,
            "harbor-console-dev"
        );
        assert_eq!(
            config.auth_url(OAuthProvider::Google),
            "http://127.0.0.1:9999/authorize"
        );
        assert_eq!(config.fixture_role, Role::Owner);
    }
}
