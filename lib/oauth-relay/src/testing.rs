//! Test doubles for the relay.
//!
//! `SimulatedBrowser` models the handful of window behaviours the
//! handshake depends on: windows with origins, popups that remember their
//! opener, origin-checked message delivery and closing. Every interaction
//! is recorded so tests can assert on ordering.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use harbor_platform_access::{AuthProvider, Role, User, UserId};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

use crate::api::{AuthApi, LoginSuccess, OAuth2LoginRequest};
use crate::error::RelayError;
use crate::host::{
    HostChannel, MessageSender, MessageSubscription, PopupFeatures, PopupHandle, PopupWindow,
    origin_of,
};
use crate::message::{RelayMessage, WindowMessage};
use crate::provider::OAuthProvider;

/// Something that happened in the simulated browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    ListenerAdded { origin: String },
    PopupOpened { url: String, name: String, features: String },
    PopupBlocked { url: String },
    MessagePosted { from: String, target_origin: String, delivered: bool },
    WindowClosed { origin: String, by_user: bool },
}

#[derive(Debug)]
struct WindowState {
    origin: String,
    location: Option<Url>,
    opener: Option<usize>,
    listeners: Vec<MessageSender>,
    closed: bool,
}

#[derive(Debug, Default)]
struct BrowserState {
    windows: Vec<WindowState>,
    events: Vec<BrowserEvent>,
    block_popups: bool,
}

/// An in-memory browser.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBrowser {
    inner: Arc<Mutex<BrowserState>>,
}

impl SimulatedBrowser {
    /// Creates a browser with no windows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BrowserState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add_window(&self, origin: &str, location: Option<Url>, opener: Option<usize>) -> SimulatedWindow {
        let mut state = self.lock();
        state.windows.push(WindowState {
            origin: origin.to_string(),
            location,
            opener,
            listeners: Vec::new(),
            closed: false,
        });
        SimulatedWindow {
            browser: self.clone(),
            id: state.windows.len() - 1,
        }
    }

    /// Opens a top-level window showing a document from `origin`.
    #[must_use]
    pub fn open_window(&self, origin: &str) -> SimulatedWindow {
        self.add_window(origin, None, None)
    }

    /// Opens a window whose opener is `opener`, already showing a document
    /// from `origin`.
    #[must_use]
    pub fn open_child(&self, opener: &SimulatedWindow, origin: &str) -> SimulatedWindow {
        self.add_window(origin, None, Some(opener.id))
    }

    /// Makes subsequent popups fail to open.
    pub fn block_popups(&self, block: bool) {
        self.lock().block_popups = block;
    }

    /// Returns every recorded event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<BrowserEvent> {
        self.lock().events.clone()
    }

    /// Returns the most recently opened window that has an opener.
    #[must_use]
    pub fn last_popup(&self) -> Option<SimulatedWindow> {
        let state = self.lock();
        let id = state.windows.iter().rposition(|w| w.opener.is_some())?;
        Some(SimulatedWindow {
            browser: self.clone(),
            id,
        })
    }
}

/// One window of a `SimulatedBrowser`.
#[derive(Debug, Clone)]
pub struct SimulatedWindow {
    browser: SimulatedBrowser,
    id: usize,
}

impl SimulatedWindow {
    fn with_state<T>(&self, f: impl FnOnce(&mut WindowState) -> T) -> T {
        let mut state = self.browser.lock();
        f(&mut state.windows[self.id])
    }

    /// Returns the URL the window was opened at or last navigated to.
    #[must_use]
    pub fn location(&self) -> Option<Url> {
        self.with_state(|w| w.location.clone())
    }

    /// Returns the origin of the current document.
    #[must_use]
    pub fn origin(&self) -> String {
        self.with_state(|w| w.origin.clone())
    }

    /// Navigates the window; the document origin follows the URL.
    pub fn navigate(&self, url: &Url) {
        self.with_state(|w| {
            w.origin = origin_of(url);
            w.location = Some(url.clone());
        });
    }

    /// Returns true once the window is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.with_state(|w| w.closed)
    }

    /// Closes the window the way a user would.
    pub fn close(&self) {
        let mut state = self.browser.lock();
        let window = &mut state.windows[self.id];
        window.closed = true;
        window.listeners.clear();
        let origin = window.origin.clone();
        state.events.push(BrowserEvent::WindowClosed {
            origin,
            by_user: true,
        });
    }

    /// Registers a listener; same as [`HostChannel::on_message`].
    #[must_use]
    pub fn subscribe(&self) -> MessageSubscription {
        self.on_message()
    }

    /// Returns the number of live listeners on this window.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.with_state(|w| w.listeners.iter().filter(|l| !l.is_closed()).count())
    }

    /// Delivers an arbitrary message to this window's listeners, as if a
    /// document at `origin` had posted it.
    pub fn inject_message(&self, origin: &str, data: JsonValue) {
        self.with_state(|w| {
            w.listeners.retain(|listener| {
                listener.deliver(WindowMessage {
                    origin: origin.to_string(),
                    data: data.clone(),
                })
            });
        });
    }
}

impl HostChannel for SimulatedWindow {
    fn current_origin(&self) -> String {
        self.origin()
    }

    fn post_to_opener(
        &self,
        message: &RelayMessage,
        target_origin: &str,
    ) -> Result<(), RelayError> {
        let data = serde_json::to_value(message).map_err(|e| RelayError::PostFailed {
            reason: e.to_string(),
        })?;

        let mut state = self.browser.lock();
        let from = state.windows[self.id].origin.clone();
        let Some(opener_id) = state.windows[self.id].opener else {
            return Err(RelayError::PostFailed {
                reason: "window has no opener".to_string(),
            });
        };

        let opener = &mut state.windows[opener_id];
        let delivered =
            !opener.closed && (target_origin == "*" || opener.origin == target_origin);
        if delivered {
            opener.listeners.retain(|listener| {
                listener.deliver(WindowMessage {
                    origin: from.clone(),
                    data: data.clone(),
                })
            });
        }
        state.events.push(BrowserEvent::MessagePosted {
            from,
            target_origin: target_origin.to_string(),
            delivered,
        });
        Ok(())
    }

    fn on_message(&self) -> MessageSubscription {
        let (sender, subscription) = MessageSubscription::channel();
        let mut state = self.browser.lock();
        let window = &mut state.windows[self.id];
        window.listeners.push(sender);
        let origin = window.origin.clone();
        state.events.push(BrowserEvent::ListenerAdded { origin });
        subscription
    }

    fn close_self(&self) {
        let mut state = self.browser.lock();
        let window = &mut state.windows[self.id];
        window.closed = true;
        window.listeners.clear();
        let origin = window.origin.clone();
        state.events.push(BrowserEvent::WindowClosed {
            origin,
            by_user: false,
        });
    }

    fn open_popup(&self, url: &Url, name: &str, features: &PopupFeatures) -> Option<PopupHandle> {
        let blocked = self.browser.lock().block_popups;
        if blocked {
            self.browser.lock().events.push(BrowserEvent::PopupBlocked {
                url: url.to_string(),
            });
            return None;
        }

        let popup = self
            .browser
            .add_window(&origin_of(url), Some(url.clone()), Some(self.id));
        self.browser.lock().events.push(BrowserEvent::PopupOpened {
            url: url.to_string(),
            name: name.to_string(),
            features: features.to_string(),
        });
        Some(PopupHandle::new(popup))
    }
}

impl PopupWindow for SimulatedWindow {
    fn is_closed(&self) -> bool {
        SimulatedWindow::is_closed(self)
    }
}

/// `AuthApi` double that returns canned results and records requests.
#[derive(Debug)]
pub struct StubAuthApi {
    auth_url: Mutex<Result<Url, RelayError>>,
    login: Result<LoginSuccess, RelayError>,
    url_calls: AtomicUsize,
    login_requests: Mutex<Vec<OAuth2LoginRequest>>,
}

impl StubAuthApi {
    fn with_login(login: Result<LoginSuccess, RelayError>) -> Self {
        Self {
            auth_url: Mutex::new(default_auth_url()),
            login,
            url_calls: AtomicUsize::new(0),
            login_requests: Mutex::new(Vec::new()),
        }
    }

    /// A backend whose code exchange succeeds.
    #[must_use]
    pub fn succeeding(user: User, access_token: &str) -> Self {
        Self::with_login(Ok(LoginSuccess {
            user,
            access_token: access_token.to_string(),
        }))
    }

    /// A backend whose code exchange fails.
    #[must_use]
    pub fn failing(error: RelayError) -> Self {
        Self::with_login(Err(error))
    }

    /// Makes the authorization URL request fail.
    pub fn fail_authorization_url(&self, error: RelayError) {
        *self.auth_url.lock().unwrap_or_else(PoisonError::into_inner) = Err(error);
    }

    /// Returns how many authorization URLs were requested.
    #[must_use]
    pub fn url_calls(&self) -> usize {
        self.url_calls.load(Ordering::SeqCst)
    }

    /// Returns every code exchange request received.
    #[must_use]
    pub fn login_requests(&self) -> Vec<OAuth2LoginRequest> {
        self.login_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn default_auth_url() -> Result<Url, RelayError> {
    const AUTH_URL: &str = "https://accounts.example.com/o/oauth2/auth?client_id=harbor-console&response_type=code&state=server-issued";
    Url::parse(AUTH_URL).map_err(|e| RelayError::InvalidUrl {
        url: AUTH_URL.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl AuthApi for StubAuthApi {
    async fn authorization_url(
        &self,
        provider: OAuthProvider,
        redirect_uri: &str,
    ) -> Result<Url, RelayError> {
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        let mut url = self
            .auth_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        url.query_pairs_mut()
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", provider.as_str());
        Ok(url)
    }

    async fn oauth2_login(&self, request: &OAuth2LoginRequest) -> Result<LoginSuccess, RelayError> {
        self.login_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.login.clone()
    }
}

/// A verified GitHub developer with fixed timestamps.
#[must_use]
pub fn fixture_user() -> User {
    User::new(
        UserId::new("usr_01HZX3K4"),
        "octo@example.com".to_string(),
        "Octo Cat".to_string(),
        Role::Developer,
    )
    .with_provider(AuthProvider::Github, Some("583231".to_string()))
    .verified(true)
    .with_timestamps(fixture_time(), fixture_time())
}

fn fixture_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}
