//! The opener half of the handshake.
//!
//! `OAuthLogin::begin` opens the popup and returns an `OpenerHandshake`
//! that resolves exactly once, from whichever happens first: a same-origin
//! message from the popup, the popup closing, or the optional timeout.

use harbor_core::{AttemptId, Result};
use harbor_platform_access::{KeyValueStore, SessionStore, User};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::api::AuthApi;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::host::{HostChannel, MessageSubscription, POPUP_WINDOW_NAME, PopupHandle};
use crate::message::{RelayMessage, WindowMessage};
use crate::provider::OAuthProvider;
use crate::state::{OAuthState, PENDING_STATE_KEY, with_state};

/// How a handshake ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The popup relayed a user and access token.
    Authenticated { user: User, access_token: String },
    /// The popup relayed an error.
    Failed { error: String },
    /// The popup closed without relaying anything.
    Abandoned,
    /// The configured timeout elapsed first.
    TimedOut,
}

/// Where a handshake stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    WaitingForMessage,
    Resolved,
    Rejected,
    Abandoned,
}

/// A sign-in attempt in flight.
#[derive(Debug)]
pub struct OpenerHandshake {
    attempt: AttemptId,
    origin: String,
    subscription: Option<MessageSubscription>,
    popup: Option<PopupHandle>,
    outcome: Option<HandshakeOutcome>,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl OpenerHandshake {
    /// Creates a handshake over an already-registered listener and an open
    /// popup. Only messages from `origin` are accepted.
    #[must_use]
    pub fn new(
        origin: String,
        subscription: MessageSubscription,
        popup: PopupHandle,
        config: &RelayConfig,
    ) -> Self {
        Self {
            attempt: AttemptId::new(),
            origin,
            subscription: Some(subscription),
            popup: Some(popup),
            outcome: None,
            poll_interval: config.poll_interval(),
            timeout: config.handshake_timeout(),
        }
    }

    /// Returns the attempt identifier.
    #[must_use]
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// Returns the outcome once resolved.
    #[must_use]
    pub fn outcome(&self) -> Option<&HandshakeOutcome> {
        self.outcome.as_ref()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        match self.outcome {
            None => HandshakeState::WaitingForMessage,
            Some(HandshakeOutcome::Authenticated { .. }) => HandshakeState::Resolved,
            Some(HandshakeOutcome::Failed { .. }) => HandshakeState::Rejected,
            Some(HandshakeOutcome::Abandoned | HandshakeOutcome::TimedOut) => {
                HandshakeState::Abandoned
            }
        }
    }

    /// Returns true while the listener is still registered.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.subscription.is_some()
    }

    /// Feeds one inbound message. Returns true if it resolved the handshake.
    ///
    /// Messages from any other origin and payloads that are not relay
    /// messages are dropped without a trace in the outcome.
    pub fn handle_message(&mut self, message: WindowMessage) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        if message.origin != self.origin {
            debug!(attempt = %self.attempt, origin = %message.origin, "dropping cross-origin message");
            return false;
        }
        let outcome = match RelayMessage::from_data(&message.data) {
            Some(RelayMessage::Success { user, access_token }) => {
                HandshakeOutcome::Authenticated { user, access_token }
            }
            Some(RelayMessage::Error { error }) => HandshakeOutcome::Failed { error },
            None => {
                debug!(attempt = %self.attempt, "dropping unrecognised message");
                return false;
            }
        };
        self.resolve(outcome);
        true
    }

    /// Checks popup liveness. Returns true if this resolved the handshake.
    ///
    /// Messages that arrived before the popup closed are processed first,
    /// so a popup that posts and closes is never mistaken for abandoned.
    pub fn check_popup(&mut self) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        if !self.popup.as_ref().is_some_and(PopupHandle::is_closed) {
            return false;
        }
        while let Some(message) = self.subscription.as_mut().and_then(MessageSubscription::try_recv)
        {
            if self.handle_message(message) {
                return true;
            }
        }
        self.resolve(HandshakeOutcome::Abandoned);
        true
    }

    /// Waits for the handshake to resolve.
    #[instrument(skip_all, fields(attempt = %self.attempt))]
    pub async fn wait(mut self) -> HandshakeOutcome {
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);

        loop {
            if let Some(outcome) = self.outcome.take() {
                return outcome;
            }
            let Some(subscription) = self.subscription.as_mut() else {
                self.resolve(HandshakeOutcome::Abandoned);
                continue;
            };

            let event = tokio::select! {
                biased;
                message = subscription.recv() => Event::Message(message),
                _ = poll.tick() => Event::Poll,
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => Event::Deadline,
            };

            match event {
                Event::Message(Some(message)) => {
                    self.handle_message(message);
                }
                Event::Message(None) => {
                    warn!("message channel closed by host");
                    self.resolve(HandshakeOutcome::Abandoned);
                }
                Event::Poll => {
                    self.check_popup();
                }
                Event::Deadline => {
                    self.resolve(HandshakeOutcome::TimedOut);
                }
            }
        }
    }

    fn resolve(&mut self, outcome: HandshakeOutcome) {
        if self.outcome.is_some() {
            return;
        }
        match &outcome {
            HandshakeOutcome::Authenticated { user, .. } => {
                info!(attempt = %self.attempt, user_id = %user.id(), "handshake resolved");
            }
            HandshakeOutcome::Failed { error } => {
                info!(attempt = %self.attempt, %error, "handshake rejected");
            }
            HandshakeOutcome::Abandoned => {
                info!(attempt = %self.attempt, "popup closed without a result");
            }
            HandshakeOutcome::TimedOut => {
                warn!(attempt = %self.attempt, "handshake timed out");
            }
        }
        self.subscription = None;
        self.popup = None;
        self.outcome = Some(outcome);
    }
}

enum Event {
    Message(Option<WindowMessage>),
    Poll,
    Deadline,
}

/// Starts sign-in attempts from the opener window.
#[derive(Debug)]
pub struct OAuthLogin<H, S, A> {
    host: H,
    storage: S,
    api: A,
    config: RelayConfig,
}

impl<H, S, A> OAuthLogin<H, S, A>
where
    H: HostChannel,
    S: KeyValueStore,
    A: AuthApi,
{
    /// Creates a login driver for the opener window.
    pub fn new(host: H, storage: S, api: A, config: RelayConfig) -> Self {
        Self {
            host,
            storage,
            api,
            config,
        }
    }

    /// Returns the relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Opens the sign-in popup for `provider`.
    ///
    /// The message listener is registered before the popup is opened.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization URL cannot be fetched, the
    /// state cannot be stored, or the browser blocks the popup.
    #[instrument(skip(self))]
    pub async fn begin(&self, provider: OAuthProvider) -> Result<OpenerHandshake, RelayError> {
        Ok(self.open(provider).await?)
    }

    async fn open(
        &self,
        provider: OAuthProvider,
    ) -> std::result::Result<OpenerHandshake, RelayError> {
        let auth_url = self
            .api
            .authorization_url(provider, self.config.redirect_uri())
            .await?;

        let state = OAuthState::mint(provider);
        state
            .store_pending(&self.storage)
            .map_err(|e| RelayError::Storage {
                reason: e.to_string(),
            })?;
        let popup_url = with_state(&auth_url, &state.encode());

        let subscription = self.host.on_message();
        let features = self.config.popup_features();
        let Some(popup) = self.host.open_popup(&popup_url, POPUP_WINDOW_NAME, &features) else {
            warn!("sign-in popup was blocked");
            self.clear_pending();
            return Err(RelayError::PopupBlocked);
        };

        let handshake =
            OpenerHandshake::new(self.host.current_origin(), subscription, popup, &self.config);
        debug!(attempt = %handshake.attempt(), "sign-in popup opened");
        Ok(handshake)
    }

    fn clear_pending(&self) {
        if let Err(e) = self.storage.remove(PENDING_STATE_KEY) {
            warn!(error = %e, "failed to clear pending OAuth2 state");
        }
    }

    /// Runs a full sign-in attempt and applies its outcome to `session`.
    ///
    /// Success adopts the user and token; a relayed error is recorded on the
    /// session. An abandoned or timed-out attempt clears the loading flag,
    /// restores whatever error the session showed before, and discards the
    /// pending state so a stale popup cannot complete it later.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt could not be started or the new
    /// session could not be persisted. The error is also recorded on the
    /// session.
    #[instrument(skip(self, session))]
    pub async fn login<T: KeyValueStore>(
        &self,
        session: &mut SessionStore<T>,
        provider: OAuthProvider,
    ) -> Result<HandshakeOutcome, RelayError> {
        let previous_error = session.state().error().map(str::to_string);
        session.set_loading(true);

        let handshake = match self.open(provider).await {
            Ok(handshake) => handshake,
            Err(e) => {
                session.fail(e.to_string());
                return Err(e.into());
            }
        };

        let outcome = handshake.wait().await;
        match &outcome {
            HandshakeOutcome::Authenticated { user, access_token } => {
                if let Err(e) = session.login(user.clone(), access_token.clone()) {
                    let err = RelayError::Storage {
                        reason: e.to_string(),
                    };
                    session.fail(err.to_string());
                    return Err(err.into());
                }
            }
            HandshakeOutcome::Failed { error } => session.fail(error.clone()),
            HandshakeOutcome::Abandoned | HandshakeOutcome::TimedOut => {
                self.clear_pending();
                match previous_error {
                    Some(error) => session.fail(error),
                    None => session.set_loading(false),
                }
            }
        }
        Ok(outcome)
    }
}
