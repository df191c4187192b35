//! Permission queries against the role table.
//!
//! All checks are synchronous, pure and allocation-light; they are meant to
//! be called on every render and every route change.

use crate::permission::resource_token;
use crate::role::{Role, permissions_for, permissions_for_name};

/// Returns true if the role is granted the permission token.
#[must_use]
pub fn has_permission(role: Role, permission: impl AsRef<str>) -> bool {
    permissions_for(role).contains(permission.as_ref())
}

/// Returns true if the role is granted at least one of the tokens.
///
/// An empty list grants nothing.
#[must_use]
pub fn has_any_permission<P: AsRef<str>>(role: Role, permissions: &[P]) -> bool {
    permissions.iter().any(|p| has_permission(role, p))
}

/// Returns true if the role is granted every one of the tokens.
///
/// An empty list is trivially satisfied.
#[must_use]
pub fn has_all_permissions<P: AsRef<str>>(role: Role, permissions: &[P]) -> bool {
    permissions.iter().all(|p| has_permission(role, p))
}

/// Returns true if the role holds `<resource>:read`.
#[must_use]
pub fn can_read_resource(role: Role, resource: &str) -> bool {
    has_permission(role, resource_token(resource, "read"))
}

/// Returns true if the role holds `<resource>:write`.
#[must_use]
pub fn can_write_resource(role: Role, resource: &str) -> bool {
    has_permission(role, resource_token(resource, "write"))
}

/// Returns true if the role holds `<resource>:delete`.
#[must_use]
pub fn can_delete_resource(role: Role, resource: &str) -> bool {
    has_permission(role, resource_token(resource, "delete"))
}

/// String-keyed variant of [`has_permission`] for role names that arrive
/// untyped. Unknown role names are granted nothing.
#[must_use]
pub fn role_has_permission(role_name: &str, permission: &str) -> bool {
    permissions_for_name(role_name).contains(permission)
}
