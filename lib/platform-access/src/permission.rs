//! Permission tokens.
//!
//! A permission is a `resource:action` token such as `deployment:deploy`.
//! Tokens are opaque keys for set membership; the only structure read out
//! of them is the resource prefix used by the read/write/delete helpers.

use serde::{Serialize, Serializer};
use std::fmt;

/// A namespaced permission token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Permission(&'static str);

/// Declares the permission catalogue.
///
/// Every token must be declared here so that it lands in
/// `Permission::ALL`, which is what the owner role is built from.
macro_rules! define_permissions {
    ($($(#[$meta:meta])* $name:ident => $token:literal,)+) => {
        impl Permission {
            $(
                $(#[$meta])*
                pub const $name: Self = Self($token);
            )+

            /// Every permission token the console defines.
            pub const ALL: &'static [Self] = &[$(Self::$name),+];
        }
    };
}

define_permissions! {
    /// View projects.
    PROJECT_READ => "project:read",
    /// Create and edit projects.
    PROJECT_WRITE => "project:write",
    /// Delete projects.
    PROJECT_DELETE => "project:delete",

    /// View deployments and their history.
    DEPLOYMENT_READ => "deployment:read",
    /// Create and edit deployment definitions.
    DEPLOYMENT_WRITE => "deployment:write",
    /// Delete deployments.
    DEPLOYMENT_DELETE => "deployment:delete",
    /// Trigger a deploy.
    DEPLOYMENT_DEPLOY => "deployment:deploy",
    /// Roll a deployment back to a previous revision.
    DEPLOYMENT_ROLLBACK => "deployment:rollback",

    POD_READ => "pod:read",
    POD_DELETE => "pod:delete",
    /// Open an interactive shell in a pod.
    POD_EXEC => "pod:exec",

    SERVICE_READ => "service:read",
    SERVICE_WRITE => "service:write",
    SERVICE_DELETE => "service:delete",

    CONFIGMAP_READ => "configmap:read",
    CONFIGMAP_WRITE => "configmap:write",
    CONFIGMAP_DELETE => "configmap:delete",

    /// Reveal secret values.
    SECRET_READ => "secret:read",
    SECRET_WRITE => "secret:write",
    SECRET_DELETE => "secret:delete",

    METRICS_READ => "metrics:read",
    LOGS_READ => "logs:read",
    ALERT_READ => "alert:read",
    ALERT_WRITE => "alert:write",
    ALERT_DELETE => "alert:delete",

    SETTINGS_READ => "settings:read",
    SETTINGS_WRITE => "settings:write",

    MEMBER_READ => "member:read",
    /// Invite members and change their roles.
    MEMBER_WRITE => "member:write",
    MEMBER_DELETE => "member:delete",

    APIKEY_READ => "apikey:read",
    APIKEY_WRITE => "apikey:write",
    APIKEY_DELETE => "apikey:delete",

    BILLING_READ => "billing:read",
    BILLING_WRITE => "billing:write",
}

impl Permission {
    /// Returns the token string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// Finds the declared permission with the given token.
    ///
    /// Matching is exact and case-sensitive.
    #[must_use]
    pub fn lookup(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.0 == token)
    }

    /// Returns the resource half of the token (`deployment` for
    /// `deployment:deploy`).
    #[must_use]
    pub fn resource(&self) -> &'static str {
        self.0.split_once(':').map_or(self.0, |(resource, _)| resource)
    }

    /// Returns the action half of the token (`deploy` for
    /// `deployment:deploy`).
    #[must_use]
    pub fn action(&self) -> &'static str {
        self.0.split_once(':').map_or("", |(_, action)| action)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

/// Builds the conventional `<resource>:<action>` token.
#[must_use]
pub fn resource_token(resource: &str, action: &str) -> String {
    format!("{resource}:{action}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_unique() {
        let unique: HashSet<_> = Permission::ALL.iter().map(Permission::as_str).collect();
        assert_eq!(unique.len(), Permission::ALL.len());
    }

    #[test]
    fn tokens_follow_resource_action_convention() {
        for permission in Permission::ALL {
            let (resource, action) = permission
                .as_str()
                .split_once(':')
                .expect("token has a colon");
            assert!(!resource.is_empty(), "{permission} has no resource");
            assert!(!action.is_empty(), "{permission} has no action");
            assert!(!action.contains(':'), "{permission} has nested segments");
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(
            Permission::lookup("deployment:deploy"),
            Some(Permission::DEPLOYMENT_DEPLOY)
        );
        assert_eq!(Permission::lookup("Deployment:Deploy"), None);
        assert_eq!(Permission::lookup("deployment"), None);
    }

    #[test]
    fn resource_and_action_split() {
        assert_eq!(Permission::DEPLOYMENT_ROLLBACK.resource(), "deployment");
        assert_eq!(Permission::DEPLOYMENT_ROLLBACK.action(), "rollback");
    }

    #[test]
    fn resource_token_builds_convention() {
        assert_eq!(resource_token("secret", "read"), "secret:read");
    }

    #[test]
    fn serializes_as_token() {
        let json = serde_json::to_string(&Permission::POD_EXEC).expect("serialize");
        assert_eq!(json, "\"pod:exec\"");
    }
}
