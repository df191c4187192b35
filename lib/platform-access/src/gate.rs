//! Declarative permission gate.
//!
//! A `Gate` decides which of two alternatives a UI subtree exposes for the
//! current role. It holds no state beyond its requirement and never
//! performs I/O, so it can be evaluated on every render.

use crate::check::{has_all_permissions, has_any_permission};
use crate::role::Role;

/// The permissions a gate asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// A single token.
    One(String),
    /// A list of tokens, combined with any/all semantics.
    Many(Vec<String>),
}

impl Requirement {
    /// Returns the required tokens as a slice.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        match self {
            Self::One(token) => std::slice::from_ref(token),
            Self::Many(tokens) => tokens,
        }
    }
}

impl From<&str> for Requirement {
    fn from(token: &str) -> Self {
        Self::One(token.to_string())
    }
}

impl From<String> for Requirement {
    fn from(token: String) -> Self {
        Self::One(token)
    }
}

impl From<crate::permission::Permission> for Requirement {
    fn from(permission: crate::permission::Permission) -> Self {
        Self::One(permission.as_str().to_string())
    }
}

impl<T: AsRef<str>> From<&[T]> for Requirement {
    fn from(tokens: &[T]) -> Self {
        Self::Many(tokens.iter().map(|t| t.as_ref().to_string()).collect())
    }
}

impl<T: AsRef<str>, const N: usize> From<[T; N]> for Requirement {
    fn from(tokens: [T; N]) -> Self {
        Self::Many(tokens.iter().map(|t| t.as_ref().to_string()).collect())
    }
}

impl<T: AsRef<str>> From<Vec<T>> for Requirement {
    fn from(tokens: Vec<T>) -> Self {
        Self::Many(tokens.iter().map(|t| t.as_ref().to_string()).collect())
    }
}

/// Selects between children and a fallback based on the viewer's role.
///
/// By default a gate requires any one of its tokens; `require_all` makes
/// it require every token. With no role loaded the gate is always closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    requirement: Requirement,
    require_all: bool,
}

impl Gate {
    /// Creates a require-any gate.
    #[must_use]
    pub fn new(requirement: impl Into<Requirement>) -> Self {
        Self {
            requirement: requirement.into(),
            require_all: false,
        }
    }

    /// Sets whether every token is required.
    #[must_use]
    pub fn require_all(mut self, require_all: bool) -> Self {
        self.require_all = require_all;
        self
    }

    /// Returns the gate's requirement.
    #[must_use]
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Returns true if the role passes the gate.
    #[must_use]
    pub fn allows(&self, role: Option<Role>) -> bool {
        let Some(role) = role else {
            return false;
        };
        let tokens = self.requirement.tokens();
        if self.require_all {
            has_all_permissions(role, tokens)
        } else {
            has_any_permission(role, tokens)
        }
    }

    /// Returns the tokens the role is missing.
    #[must_use]
    pub fn missing(&self, role: Option<Role>) -> Vec<String> {
        self.requirement
            .tokens()
            .iter()
            .filter(|token| role.is_none_or(|r| !r.permissions().contains(token)))
            .cloned()
            .collect()
    }

    /// Returns `children` if the role passes, otherwise `fallback`.
    pub fn select<T>(&self, role: Option<Role>, children: T, fallback: T) -> T {
        if self.allows(role) { children } else { fallback }
    }

    /// Lazily builds whichever alternative the role gets.
    pub fn render<T>(
        &self,
        role: Option<Role>,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> T {
        if self.allows(role) {
            children()
        } else {
            fallback()
        }
    }

    /// Builds `children` if the role passes; the fallback is nothing.
    pub fn show<T>(&self, role: Option<Role>, children: impl FnOnce() -> T) -> Option<T> {
        self.allows(role).then(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Permission;

    #[test]
    fn require_all_needs_both() {
        let gate = Gate::new(["deployment:read", "billing:read"]).require_all(true);

        assert_eq!(gate.select(Some(Role::Viewer), "children", "fallback"), "fallback");
        assert_eq!(gate.select(Some(Role::Developer), "children", "fallback"), "fallback");
        assert_eq!(gate.select(Some(Role::Owner), "children", "fallback"), "children");
    }

    #[test]
    fn require_any_is_default() {
        let gate = Gate::new(["deployment:deploy", "deployment:read"]);
        assert!(gate.allows(Some(Role::Viewer)));
    }

    #[test]
    fn single_token_gate() {
        let gate = Gate::new(Permission::DEPLOYMENT_DEPLOY);
        assert!(!gate.allows(Some(Role::Viewer)));
        assert!(gate.allows(Some(Role::Developer)));
    }

    #[test]
    fn no_role_is_denied() {
        let gate = Gate::new("deployment:read");
        assert!(!gate.allows(None));
        assert_eq!(gate.show(None, || "visible"), None);
    }

    #[test]
    fn show_defaults_fallback_to_nothing() {
        let gate = Gate::new("billing:write");
        assert_eq!(gate.show(Some(Role::Owner), || 1), Some(1));
        assert_eq!(gate.show(Some(Role::Developer), || 1), None);
    }

    #[test]
    fn render_only_builds_selected_branch() {
        let gate = Gate::new("secret:read");
        let mut built = Vec::new();
        let chosen = gate.render(
            Some(Role::Viewer),
            || {
                built.push("children");
                "children"
            },
            || "fallback",
        );
        assert_eq!(chosen, "fallback");
        assert!(built.is_empty());
    }

    #[test]
    fn empty_requirement_semantics() {
        let none: Vec<&str> = Vec::new();
        assert!(!Gate::new(none.clone()).allows(Some(Role::Owner)));
        assert!(Gate::new(none).require_all(true).allows(Some(Role::Viewer)));
    }

    #[test]
    fn missing_lists_unheld_tokens() {
        let gate = Gate::new(["deployment:read", "billing:read"]).require_all(true);
        assert_eq!(gate.missing(Some(Role::Developer)), vec!["billing:read"]);
        assert!(gate.missing(Some(Role::Owner)).is_empty());
        assert_eq!(gate.missing(None).len(), 2);
    }
}
