//! Relay configuration.
//!
//! Both halves of the handshake read the same configuration: the opener
//! needs the backend base URL and the popup geometry, the popup needs the
//! backend base URL and the registered redirect URI.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::host::PopupFeatures;

/// Configuration for the OAuth2 popup relay.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the console backend (e.g., "https://api.example.com").
    api_base_url: String,
    /// Callback URL registered with every identity provider. Sent verbatim
    /// when fetching the authorization URL and when exchanging the code.
    redirect_uri: String,
    /// Popup width in pixels.
    /// Default: 500
    #[serde(default = "default_popup_width")]
    popup_width: u32,
    /// Popup height in pixels.
    /// Default: 600
    #[serde(default = "default_popup_height")]
    popup_height: u32,
    /// Interval between popup liveness checks, in milliseconds.
    /// Default: 1000
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
    /// Give up on a handshake after this many seconds.
    /// Default: unset, wait for as long as the popup stays open.
    #[serde(default)]
    handshake_timeout_secs: Option<u64>,
}

fn default_popup_width() -> u32 {
    500
}

fn default_popup_height() -> u32 {
    600
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl RelayConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(api_base_url: String, redirect_uri: String) -> Self {
        Self {
            api_base_url,
            redirect_uri,
            popup_width: default_popup_width(),
            popup_height: default_popup_height(),
            poll_interval_ms: default_poll_interval_ms(),
            handshake_timeout_secs: None,
        }
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(api_base_url: String, redirect_uri: String) -> RelayConfigBuilder {
        RelayConfigBuilder::new(api_base_url, redirect_uri)
    }

    /// Loads configuration from `HARBOR_RELAY__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("HARBOR_RELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the backend base URL.
    #[must_use]
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Returns the registered redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns the popup window features.
    #[must_use]
    pub fn popup_features(&self) -> PopupFeatures {
        PopupFeatures {
            width: self.popup_width,
            height: self.popup_height,
        }
    }

    /// Returns the popup liveness poll interval, never shorter than 1 ms.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Returns the overall handshake timeout, if one is configured.
    #[must_use]
    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for `RelayConfig`.
#[derive(Debug)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(api_base_url: String, redirect_uri: String) -> Self {
        Self {
            config: RelayConfig::new(api_base_url, redirect_uri),
        }
    }

    /// Sets the popup size in pixels.
    #[must_use]
    pub fn popup_size(mut self, width: u32, height: u32) -> Self {
        self.config.popup_width = width;
        self.config.popup_height = height;
        self
    }

    /// Sets the popup liveness poll interval in milliseconds.
    #[must_use]
    pub fn poll_interval_ms(mut self, interval: u64) -> Self {
        self.config.poll_interval_ms = interval;
        self
    }

    /// Sets the overall handshake timeout in seconds.
    #[must_use]
    pub fn handshake_timeout_secs(mut self, timeout: Option<u64>) -> Self {
        self.config.handshake_timeout_secs = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RelayConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_fields_omitted() {
        let config: RelayConfig = serde_json::from_str(
            r#"{"api_base_url":"http://localhost:8080","redirect_uri":"http://localhost:3000/auth/callback"}"#,
        )
        .expect("deserialize");

        assert_eq!(config.popup_features().to_string(), "width=500,height=600");
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.handshake_timeout(), None);
        assert_eq!(config, RelayConfig::new(
            "http://localhost:8080".to_string(),
            "http://localhost:3000/auth/callback".to_string(),
        ));
    }

    #[test]
    fn builder_overrides() {
        let config = RelayConfig::builder(
            "https://api.example.com".to_string(),
            "https://console.example.com/auth/callback".to_string(),
        )
        .popup_size(640, 720)
        .poll_interval_ms(250)
        .handshake_timeout_secs(Some(120))
        .build();

        assert_eq!(config.api_base_url(), "https://api.example.com");
        assert_eq!(config.popup_features().width, 640);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.handshake_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let built = RelayConfig::builder(
            "http://localhost:8080".to_string(),
            "http://localhost:3000/auth/callback".to_string(),
        )
        .poll_interval_ms(0)
        .build();
        assert_eq!(built.poll_interval(), Duration::from_millis(1));

        let loaded: RelayConfig = config::Config::builder()
            .set_override("api_base_url", "http://127.0.0.1:8080")
            .and_then(|b| b.set_override("redirect_uri", "http://127.0.0.1:3000/cb"))
            .and_then(|b| b.set_override("poll_interval_ms", 0))
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .expect("load config");
        assert_eq!(loaded.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn loads_from_config_source() {
        let config: RelayConfig = config::Config::builder()
            .set_override("api_base_url", "http://127.0.0.1:8080")
            .and_then(|b| b.set_override("redirect_uri", "http://127.0.0.1:3000/cb"))
            .and_then(|b| b.set_override("poll_interval_ms", 500))
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .expect("load config");

        assert_eq!(config.redirect_uri(), "http://127.0.0.1:3000/cb");
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.popup_features().height, 600);
    }
}
