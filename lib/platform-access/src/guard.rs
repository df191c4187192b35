//! Route-level access checks.
//!
//! Pages that need a signed-in user, and optionally a permission, are
//! wrapped in a `RouteGuard`. The guard only decides; the router acts on
//! the decision.

use tracing::debug;

use crate::error::AuthorizationError;
use crate::gate::{Gate, Requirement};
use crate::session::AuthState;

/// Outcome of checking a route against the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the route.
    Allow,
    /// No session; send the user to the login page.
    RedirectToLogin,
    /// Signed in, but the role lacks permissions for this route.
    Forbidden {
        /// Tokens the role does not hold.
        missing: Vec<String>,
    },
}

/// Guard for a protected route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    gate: Option<Gate>,
}

impl RouteGuard {
    /// A guard that only requires a signed-in user.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// A guard that additionally requires any of the given tokens.
    #[must_use]
    pub fn with_permission(requirement: impl Into<Requirement>) -> Self {
        Self {
            gate: Some(Gate::new(requirement)),
        }
    }

    /// A guard with an explicit gate.
    #[must_use]
    pub fn with_gate(gate: Gate) -> Self {
        Self { gate: Some(gate) }
    }

    /// Decides whether the current session may see the route.
    #[must_use]
    pub fn check(&self, state: &AuthState) -> GuardDecision {
        if !state.is_authenticated() {
            return GuardDecision::RedirectToLogin;
        }
        match &self.gate {
            Some(gate) if !gate.allows(state.role()) => {
                let missing = gate.missing(state.role());
                debug!(role = ?state.role(), ?missing, "route forbidden");
                GuardDecision::Forbidden { missing }
            }
            _ => GuardDecision::Allow,
        }
    }
}

/// Imperative check for a single permission.
///
/// # Errors
///
/// Returns `NotAuthenticated` without a session and `PermissionDenied` if
/// the role lacks the token.
pub fn require_permission(
    state: &AuthState,
    permission: impl AsRef<str>,
) -> Result<(), AuthorizationError> {
    let permission = permission.as_ref();
    let role = match (state.is_authenticated(), state.role()) {
        (true, Some(role)) => role,
        _ => return Err(AuthorizationError::NotAuthenticated),
    };
    if role.permissions().contains(permission) {
        Ok(())
    } else {
        Err(AuthorizationError::PermissionDenied {
            role,
            permission: permission.to_string(),
        })
    }
}
