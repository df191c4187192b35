//! OAuth2 login across a popup window boundary.
//!
//! The console never navigates away to sign in. Instead the opener window
//! asks the backend for a provider authorization URL, opens it in a popup
//! and waits. The provider redirects the popup back to the console's
//! callback page, which exchanges the code with the backend and posts the
//! result to the opener as a single cross-window message.
//!
//! ```text
//! opener                         popup                        backend
//!   | GET  .../{provider}/url                                    |
//!   |----------------------------------------------------------->|
//!   | store state, listen, open  |                               |
//!   |--------------------------->|  provider consent + redirect  |
//!   |                            | POST .../oauth2/login         |
//!   |                            |------------------------------>|
//!   |     OAUTH2_SUCCESS/ERROR   |                               |
//!   |<---------------------------| close                         |
//! ```
//!
//! Both sides talk to the browser only through [`HostChannel`], so the
//! whole handshake runs under test against [`testing::SimulatedBrowser`].

pub mod api;
pub mod config;
pub mod error;
pub mod host;
pub mod message;
pub mod opener;
pub mod popup;
pub mod provider;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{AuthApi, AuthResponse, AuthUrlResponse, HttpAuthApi, LoginSuccess, OAuth2LoginRequest};
pub use config::{RelayConfig, RelayConfigBuilder};
pub use error::RelayError;
pub use host::{
    HostChannel, MessageSender, MessageSubscription, POPUP_WINDOW_NAME, PopupFeatures,
    PopupHandle, PopupWindow, origin_of,
};
pub use message::{RelayMessage, WindowMessage};
pub use opener::{HandshakeOutcome, HandshakeState, OAuthLogin, OpenerHandshake};
pub use popup::{CallbackParams, PopupRelay};
pub use provider::OAuthProvider;
pub use state::{OAuthState, PENDING_STATE_KEY, provider_from_state, with_state};
