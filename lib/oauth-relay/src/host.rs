//! The browser as seen by the relay.
//!
//! `HostChannel` covers exactly the window globals the handshake touches:
//! the document origin, posting to the opener, listening for messages,
//! opening a popup and closing the current window. An embedding
//! application binds it to the real browser; tests bind it to
//! [`crate::testing::SimulatedBrowser`].

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

use crate::error::RelayError;
use crate::message::{RelayMessage, WindowMessage};

/// Window name the sign-in popup is opened under.
pub const POPUP_WINDOW_NAME: &str = "harbor-oauth2";

/// Returns the serialized origin of a URL, e.g. `https://example.com:8443`.
#[must_use]
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Geometry of the sign-in popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for PopupFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "width={},height={}", self.width, self.height)
    }
}

/// A window opened by this one.
pub trait PopupWindow: Send + Sync {
    /// Returns true once the window has been closed, by itself or the user.
    fn is_closed(&self) -> bool;
}

/// Handle to an opened popup.
#[derive(Clone)]
pub struct PopupHandle {
    window: Arc<dyn PopupWindow>,
}

impl PopupHandle {
    /// Wraps a host popup.
    pub fn new(window: impl PopupWindow + 'static) -> Self {
        Self {
            window: Arc::new(window),
        }
    }

    /// Returns true once the popup has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.window.is_closed()
    }
}

impl fmt::Debug for PopupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Host side of a message listener.
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: mpsc::UnboundedSender<WindowMessage>,
}

impl MessageSender {
    /// Delivers a message. Returns false if the listener has been removed.
    pub fn deliver(&self, message: WindowMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Returns true if the listener has been removed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A registered message listener. Dropping it removes the listener.
#[derive(Debug)]
pub struct MessageSubscription {
    rx: mpsc::UnboundedReceiver<WindowMessage>,
}

impl MessageSubscription {
    /// Creates a connected sender and subscription.
    #[must_use]
    pub fn channel() -> (MessageSender, MessageSubscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MessageSender { tx }, MessageSubscription { rx })
    }

    /// Waits for the next message. Returns `None` once the host has dropped
    /// every sender.
    pub async fn recv(&mut self) -> Option<WindowMessage> {
        self.rx.recv().await
    }

    /// Returns an already-delivered message without waiting.
    pub fn try_recv(&mut self) -> Option<WindowMessage> {
        self.rx.try_recv().ok()
    }
}

/// Window operations the handshake needs from its host.
pub trait HostChannel: Send + Sync {
    /// Returns the origin of the current document.
    fn current_origin(&self) -> String;

    /// Posts a message to the window that opened this one.
    ///
    /// The browser drops the message if the opener's origin differs from
    /// `target_origin`; that is not reported back.
    ///
    /// # Errors
    ///
    /// Returns `PostFailed` if there is no opener or the message cannot be
    /// serialized.
    fn post_to_opener(&self, message: &RelayMessage, target_origin: &str)
    -> Result<(), RelayError>;

    /// Registers a message listener on the current window.
    fn on_message(&self) -> MessageSubscription;

    /// Closes the current window.
    fn close_self(&self);

    /// Opens a popup window, or returns `None` if the browser blocked it.
    fn open_popup(&self, url: &Url, name: &str, features: &PopupFeatures) -> Option<PopupHandle>;
}

impl<T: HostChannel + ?Sized> HostChannel for Arc<T> {
    fn current_origin(&self) -> String {
        (**self).current_origin()
    }

    fn post_to_opener(
        &self,
        message: &RelayMessage,
        target_origin: &str,
    ) -> Result<(), RelayError> {
        (**self).post_to_opener(message, target_origin)
    }

    fn on_message(&self) -> MessageSubscription {
        (**self).on_message()
    }

    fn close_self(&self) {
        (**self).close_self();
    }

    fn open_popup(&self, url: &Url, name: &str, features: &PopupFeatures) -> Option<PopupHandle> {
        (**self).open_popup(url, name, features)
    }
}
