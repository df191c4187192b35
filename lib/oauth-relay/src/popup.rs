//! The popup half of the handshake.
//!
//! The popup lands on the console's callback page after the provider
//! redirect. It validates the callback, exchanges the code once, posts one
//! message to its opener and closes itself, whatever happened.

use harbor_platform_access::KeyValueStore;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::api::{AuthApi, LoginSuccess, OAuth2LoginRequest};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::host::{HostChannel, origin_of};
use crate::message::RelayMessage;
use crate::state::{OAuthState, provider_from_state};

/// Query parameters of the provider redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Reads the parameters from a callback URL. Empty values count as
    /// absent; the first occurrence of a repeated parameter wins.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// Drives the callback page.
#[derive(Debug)]
pub struct PopupRelay<H, S, A> {
    host: H,
    storage: S,
    api: A,
    config: RelayConfig,
}

impl<H, S, A> PopupRelay<H, S, A>
where
    H: HostChannel,
    S: KeyValueStore,
    A: AuthApi,
{
    /// Creates a relay for the current popup window.
    pub fn new(host: H, storage: S, api: A, config: RelayConfig) -> Self {
        Self {
            host,
            storage,
            api,
            config,
        }
    }

    /// Completes the handshake for the page at `callback_url`.
    ///
    /// Posts exactly one message to the opener, targeted at this window's
    /// own origin, then closes the window. Returns the posted message.
    #[instrument(skip_all)]
    pub async fn complete(&self, callback_url: &Url) -> RelayMessage {
        let message = match self.exchange(callback_url).await {
            Ok(login) => {
                info!(user_id = %login.user.id(), "sign-in succeeded");
                RelayMessage::success(login.user, login.access_token)
            }
            Err(e) => {
                warn!(error = %e, "sign-in failed");
                RelayMessage::error(e.to_string())
            }
        };

        let origin = self.host.current_origin();
        if let Err(e) = self.host.post_to_opener(&message, &origin) {
            error!(error = %e, "could not relay result to opener");
        }
        self.host.close_self();
        message
    }

    async fn exchange(&self, callback_url: &Url) -> Result<LoginSuccess, RelayError> {
        let params = CallbackParams::from_url(callback_url);

        if let Some(error) = params.error {
            return Err(RelayError::ProviderDenied {
                error,
                description: params.error_description,
            });
        }

        let redirect_uri = self.config.redirect_uri();
        let registered = Url::parse(redirect_uri).map_err(|e| RelayError::InvalidUrl {
            url: redirect_uri.to_string(),
            reason: e.to_string(),
        })?;
        if origin_of(callback_url) != origin_of(&registered)
            || callback_url.path() != registered.path()
        {
            return Err(RelayError::RedirectUriMismatch {
                expected: redirect_uri.to_string(),
                actual: format!("{}{}", origin_of(callback_url), callback_url.path()),
            });
        }

        let code = params.code.ok_or(RelayError::MissingCode)?;
        let state = params.state.unwrap_or_default();
        let provider = provider_from_state(&state).ok_or(RelayError::UnknownProvider)?;

        let pending = OAuthState::take_pending(&self.storage);
        if pending.as_deref() != Some(state.as_str()) {
            return Err(RelayError::StateMismatch);
        }

        debug!(%provider, "exchanging authorization code");
        self.api
            .oauth2_login(&OAuth2LoginRequest {
                provider,
                code,
                redirect_uri: redirect_uri.to_string(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OAuthProvider;
    use crate::state::PENDING_STATE_KEY;
    use crate::testing::{BrowserEvent, SimulatedBrowser, SimulatedWindow, StubAuthApi, fixture_user};
    use harbor_platform_access::MemoryStore;
    use std::sync::Arc;

    const CONSOLE: &str = "http://localhost:3000";
    const CALLBACK: &str = "http://localhost:3000/auth/callback";

    struct Fixture {
        browser: SimulatedBrowser,
        opener: SimulatedWindow,
        popup: SimulatedWindow,
        storage: Arc<MemoryStore>,
        api: Arc<StubAuthApi>,
        relay: PopupRelay<SimulatedWindow, Arc<MemoryStore>, Arc<StubAuthApi>>,
    }

    fn fixture(api: StubAuthApi) -> Fixture {
        let browser = SimulatedBrowser::new();
        let opener = browser.open_window(CONSOLE);
        let popup = browser.open_child(&opener, CONSOLE);
        let storage = Arc::new(MemoryStore::new());
        let api = Arc::new(api);
        let config = RelayConfig::new("http://localhost:8080".to_string(), CALLBACK.to_string());
        let relay = PopupRelay::new(popup.clone(), Arc::clone(&storage), Arc::clone(&api), config);
        Fixture {
            browser,
            opener,
            popup,
            storage,
            api,
            relay,
        }
    }

    fn posted(browser: &SimulatedBrowser) -> Vec<(String, bool)> {
        browser
            .events()
            .into_iter()
            .filter_map(|event| match event {
                BrowserEvent::MessagePosted {
                    target_origin,
                    delivered,
                    ..
                } => Some((target_origin, delivered)),
                _ => None,
            })
            .collect()
    }

    fn callback(query: &str) -> Url {
        Url::parse(&format!("{CALLBACK}?{query}")).expect("url")
    }

    fn github_state(storage: &MemoryStore) -> String {
        let state = OAuthState::new(OAuthProvider::Github, "n0nce");
        state.store_pending(storage).expect("store");
        url_encode(&state.encode())
    }

    fn url_encode(value: &str) -> String {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }

    #[tokio::test]
    async fn success_posts_to_own_origin_and_closes() {
        let f = fixture(StubAuthApi::succeeding(fixture_user(), "T"));
        let mut inbox = f.opener.subscribe();
        let state = github_state(&f.storage);

        let message = f.relay.complete(&callback(&format!("code=abc&state={state}"))).await;

        assert_eq!(message, RelayMessage::success(fixture_user(), "T"));
        assert!(f.popup.is_closed());
        let delivered = inbox.try_recv().expect("opener received message");
        assert_eq!(delivered.origin, CONSOLE);
        assert_eq!(RelayMessage::from_data(&delivered.data), Some(message));
        assert_eq!(inbox.try_recv(), None);
        assert_eq!(posted(&f.browser), vec![(CONSOLE.to_string(), true)]);

        let requests = f.api.login_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].provider, OAuthProvider::Github);
        assert_eq!(requests[0].code, "abc");
        assert_eq!(requests[0].redirect_uri, CALLBACK);
        assert_eq!(f.storage.get(PENDING_STATE_KEY), None);
    }

    #[tokio::test]
    async fn state_without_marker_errors_before_network() {
        let f = fixture(StubAuthApi::succeeding(fixture_user(), "T"));
        let mut inbox = f.opener.subscribe();

        let message = f.relay.complete(&callback("code=abc&state=github")).await;

        assert_eq!(message, RelayMessage::error(RelayError::UnknownProvider.to_string()));
        assert!(f.api.login_requests().is_empty());
        assert!(f.popup.is_closed());
        assert!(inbox.try_recv().is_some());
        assert_eq!(posted(&f.browser), vec![(CONSOLE.to_string(), true)]);
    }

    #[tokio::test]
    async fn opener_on_other_origin_receives_nothing() {
        let f = fixture(StubAuthApi::succeeding(fixture_user(), "T"));
        let state = github_state(&f.storage);
        f.opener
            .navigate(&Url::parse("https://other.example.com/landing").expect("url"));
        let mut inbox = f.opener.subscribe();

        let message = f
            .relay
            .complete(&callback(&format!("code=abc&state={state}")))
            .await;

        assert!(message.is_success());
        assert_eq!(inbox.try_recv(), None);
        assert_eq!(posted(&f.browser), vec![(CONSOLE.to_string(), false)]);
        assert!(f.popup.is_closed());
    }

    #[tokio::test]
    async fn missing_code_errors_before_network() {
        let f = fixture(StubAuthApi::succeeding(fixture_user(), "T"));
        let state = github_state(&f.storage);

        let message = f.relay.complete(&callback(&format!("state={state}"))).await;

        assert_eq!(message, RelayMessage::error(RelayError::MissingCode.to_string()));
        assert!(f.api.login_requests().is_empty());
    }

    #[tokio::test]
    async fn provider_denial_is_relayed() {
        let f = fixture(StubAuthApi::succeeding(fixture_user(), "T"));

        let message = f
            .relay
            .complete(&callback(
                "error=access_denied&error_description=User+cancelled",
            ))
            .await;

        assert_eq!(
            message,
            RelayMessage::error("sign-in was denied: User cancelled")
        );
        assert!(f.api.login_requests().is_empty());
        assert!(f.popup.is_closed());
    }

    #[tokio::test]
    async fn forged_state_is_rejected() {
        let f = fixture(StubAuthApi::succeeding(fixture_user(), "T"));
        github_state(&f.storage);
        let forged = url_encode("provider=github&nonce=attacker");

        let message = f
            .relay
            .complete(&callback(&format!("code=abc&state={forged}")))
            .await;

        assert_eq!(message, RelayMessage::error(RelayError::StateMismatch.to_string()));
        assert!(f.api.login_requests().is_empty());
    }

    #[tokio::test]
    async fn state_without_pending_attempt_is_rejected() {
        let f = fixture(StubAuthApi::succeeding(fixture_user(), "T"));
        let state = url_encode("provider=github&nonce=n0nce");

        let message = f
            .relay
            .complete(&callback(&format!("code=abc&state={state}")))
            .await;

        assert_eq!(message, RelayMessage::error(RelayError::StateMismatch.to_string()));
    }

    #[tokio::test]
    async fn wrong_callback_path_is_a_redirect_mismatch() {
        let f = fixture(StubAuthApi::succeeding(fixture_user(), "T"));
        let state = github_state(&f.storage);
        let url = Url::parse(&format!("{CONSOLE}/console/auth/callback?code=abc&state={state}"))
            .expect("url");

        let message = f.relay.complete(&url).await;

        match message {
            RelayMessage::Error { error } => assert!(error.starts_with("redirect_uri mismatch")),
            other => panic!("expected error, got {other:?}"),
        }
        assert!(f.api.login_requests().is_empty());
    }

    #[tokio::test]
    async fn backend_rejection_surfaces_message() {
        let f = fixture(StubAuthApi::failing(RelayError::Rejected {
            message: "Account suspended".to_string(),
        }));
        let state = github_state(&f.storage);

        let message = f
            .relay
            .complete(&callback(&format!("code=abc&state={state}")))
            .await;

        assert_eq!(message, RelayMessage::error("Account suspended"));
        assert_eq!(f.api.login_requests().len(), 1);
        assert!(f.popup.is_closed());
    }

    #[tokio::test]
    async fn closes_even_without_opener() {
        let browser = SimulatedBrowser::new();
        let orphan = browser.open_window(CONSOLE);
        let relay = PopupRelay::new(
            orphan.clone(),
            MemoryStore::new(),
            StubAuthApi::succeeding(fixture_user(), "T"),
            RelayConfig::new("http://localhost:8080".to_string(), CALLBACK.to_string()),
        );

        relay.complete(&callback("code=abc&state=github")).await;
        assert!(orphan.is_closed());
    }

    #[test]
    fn callback_params_parsing() {
        let params = CallbackParams::from_url(&callback(
            "code=4%2F0Ab&state=provider%3Dgoogle%26nonce%3Dx&code=second&error=",
        ));
        assert_eq!(params.code.as_deref(), Some("4/0Ab"));
        assert_eq!(params.state.as_deref(), Some("provider=google&nonce=x"));
        assert_eq!(params.error, None);
    }
}
