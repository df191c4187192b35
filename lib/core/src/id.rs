//! Identifiers minted by the console itself.

use std::fmt;
use ulid::Ulid;

/// Identifies one OAuth2 popup handshake attempt.
///
/// Minted when a sign-in is started and attached to the attempt's tracing
/// span, so the URL fetch, popup lifetime and outcome of one click can be
/// correlated in logs. Displayed as `att_<ulid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(Ulid);

impl AttemptId {
    /// Mints a fresh attempt ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "att_{}", self.0)
    }
}
