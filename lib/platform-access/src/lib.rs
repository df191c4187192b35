//! Identity, session and authorization for the Harbor console.
//!
//! This crate provides:
//! - The backend's `User` record and its `Role`
//! - The static role → permission table and the checks built on it
//! - `Gate` and `RouteGuard` for hiding UI and protecting routes
//! - `AuthState` and the `SessionStore` that persists it
//!
//! # Access Control Model
//!
//! Every user carries exactly one role. A role grants a fixed set of
//! `resource:action` tokens; `owner` holds every declared token,
//! `developer` operates workloads, and `viewer` only reads.
//!
//! # Example
//!
//! ```
//! use harbor_platform_access::{
//!     Gate, MemoryStore, Permission, Role, SessionStore, User, UserId, has_permission,
//! };
//!
//! let mut session = SessionStore::load(MemoryStore::new());
//! let user = User::new(
//!     UserId::new("u_42"),
//!     "alice@example.com".to_string(),
//!     "Alice".to_string(),
//!     Role::Viewer,
//! );
//! session.login(user, "access-token".to_string()).unwrap();
//!
//! assert!(session.state().is_authenticated());
//! assert!(has_permission(Role::Viewer, "deployment:read"));
//!
//! let deploy = Gate::new(Permission::DEPLOYMENT_DEPLOY);
//! assert_eq!(deploy.select(session.state().role(), "Deploy", "Read only"), "Read only");
//! ```

pub mod check;
pub mod error;
pub mod gate;
pub mod guard;
pub mod permission;
pub mod role;
pub mod session;
pub mod storage;
pub mod user;

// Re-export main types at crate root
pub use check::{
    can_delete_resource, can_read_resource, can_write_resource, has_all_permissions,
    has_any_permission, has_permission, role_has_permission,
};
pub use error::{AuthorizationError, StorageError};
pub use gate::{Gate, Requirement};
pub use guard::{GuardDecision, RouteGuard, require_permission};
pub use permission::{Permission, resource_token};
pub use role::{PermissionSet, Role, UnknownRole, permissions_for, permissions_for_name};
pub use session::{AUTH_STORAGE_KEY, AuthState, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use user::{AuthProvider, User, UserId};
