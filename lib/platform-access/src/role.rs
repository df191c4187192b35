//! Roles and the static role → permission table.
//!
//! The table is the single source of truth for what a role may do. It is
//! built once on first use and never mutated; every check is a set lookup
//! against it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::permission::Permission;

/// Organisation role of a console user.
///
/// The set is closed: a role string from the backend that is not one of
/// these fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control, including billing and membership.
    Owner,
    /// Builds and operates workloads.
    Developer,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// Every role, in descending order of privilege.
    pub const ALL: [Role; 3] = [Role::Owner, Role::Developer, Role::Viewer];

    /// Returns the wire name of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Developer => "developer",
            Self::Viewer => "viewer",
        }
    }

    /// Returns the permissions granted to this role.
    #[must_use]
    pub fn permissions(&self) -> &'static PermissionSet {
        permissions_for(*self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a role name is not part of the closed role set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole {
    /// The rejected name.
    pub name: String,
}

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.name)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole {
                name: s.to_string(),
            })
    }
}

/// The immutable set of permission tokens granted to a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    tokens: BTreeSet<&'static str>,
}

impl PermissionSet {
    /// Creates a set from declared permissions.
    #[must_use]
    pub fn from_permissions(permissions: &[Permission]) -> Self {
        Self {
            tokens: permissions.iter().map(Permission::as_str).collect(),
        }
    }

    /// Returns the empty set.
    #[must_use]
    pub fn empty() -> &'static Self {
        static EMPTY: PermissionSet = PermissionSet {
            tokens: BTreeSet::new(),
        };
        &EMPTY
    }

    /// Returns true if the token is in the set. Matching is exact.
    #[must_use]
    pub fn contains(&self, permission: &str) -> bool {
        self.tokens.contains(permission)
    }

    /// Returns the number of tokens in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the set grants nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterates over the tokens in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tokens.iter().copied()
    }
}

const DEVELOPER_PERMISSIONS: &[Permission] = &[
    Permission::PROJECT_READ,
    Permission::PROJECT_WRITE,
    Permission::DEPLOYMENT_READ,
    Permission::DEPLOYMENT_WRITE,
    Permission::DEPLOYMENT_DEPLOY,
    Permission::DEPLOYMENT_ROLLBACK,
    Permission::POD_READ,
    Permission::POD_DELETE,
    Permission::POD_EXEC,
    Permission::SERVICE_READ,
    Permission::SERVICE_WRITE,
    Permission::CONFIGMAP_READ,
    Permission::CONFIGMAP_WRITE,
    Permission::SECRET_READ,
    Permission::SECRET_WRITE,
    Permission::METRICS_READ,
    Permission::LOGS_READ,
    Permission::ALERT_READ,
    Permission::ALERT_WRITE,
    Permission::SETTINGS_READ,
    Permission::MEMBER_READ,
    Permission::APIKEY_READ,
    Permission::APIKEY_WRITE,
];

const VIEWER_PERMISSIONS: &[Permission] = &[
    Permission::PROJECT_READ,
    Permission::DEPLOYMENT_READ,
    Permission::POD_READ,
    Permission::SERVICE_READ,
    Permission::CONFIGMAP_READ,
    Permission::METRICS_READ,
    Permission::LOGS_READ,
    Permission::ALERT_READ,
    Permission::SETTINGS_READ,
    Permission::MEMBER_READ,
];

static ROLE_PERMISSIONS: LazyLock<HashMap<Role, PermissionSet>> = LazyLock::new(|| {
    HashMap::from([
        (Role::Owner, PermissionSet::from_permissions(Permission::ALL)),
        (
            Role::Developer,
            PermissionSet::from_permissions(DEVELOPER_PERMISSIONS),
        ),
        (
            Role::Viewer,
            PermissionSet::from_permissions(VIEWER_PERMISSIONS),
        ),
    ])
});

/// Returns the permissions granted to a role.
#[must_use]
pub fn permissions_for(role: Role) -> &'static PermissionSet {
    ROLE_PERMISSIONS.get(&role).unwrap_or(PermissionSet::empty())
}

/// Returns the permissions granted to a role given by name.
///
/// Names outside the role set get the empty set.
#[must_use]
pub fn permissions_for_name(name: &str) -> &'static PermissionSet {
    name.parse::<Role>()
        .map_or(PermissionSet::empty(), permissions_for)
}
