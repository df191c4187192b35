//! Error types for the platform-access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `AuthorizationError`: a route or action was refused
//! - `StorageError`: the persisted session could not be written or cleared

use std::fmt;

use crate::role::Role;

/// Errors from authorization checks.
///
/// A closed gate in the UI is not an error; these are returned only by
/// imperative checks such as route guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// No user is loaded.
    NotAuthenticated,
    /// The user's role lacks a required permission.
    PermissionDenied { role: Role, permission: String },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => {
                write!(f, "user is not authenticated")
            }
            Self::PermissionDenied { role, permission } => {
                write!(f, "role '{role}' lacks permission '{permission}'")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Errors from the key-value storage backing the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Writing a key failed.
    WriteFailed { key: String, reason: String },
    /// Removing a key failed.
    RemoveFailed { key: String, reason: String },
    /// The value could not be serialized.
    SerializeFailed { reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed { key, reason } => {
                write!(f, "failed to write storage key '{key}': {reason}")
            }
            Self::RemoveFailed { key, reason } => {
                write!(f, "failed to remove storage key '{key}': {reason}")
            }
            Self::SerializeFailed { reason } => {
                write!(f, "failed to serialize session: {reason}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_error_not_authenticated_display() {
        let err = AuthorizationError::NotAuthenticated;
        assert!(err.to_string().contains("not authenticated"));
    }

    #[test]
    fn authorization_error_permission_denied_display() {
        let err = AuthorizationError::PermissionDenied {
            role: Role::Viewer,
            permission: "deployment:deploy".to_string(),
        };
        assert!(err.to_string().contains("viewer"));
        assert!(err.to_string().contains("deployment:deploy"));
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::WriteFailed {
            key: "harbor-auth".to_string(),
            reason: "quota exceeded".to_string(),
        };
        assert!(err.to_string().contains("harbor-auth"));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
