//! # viewrole Core
//!
//! Building blocks shared by the viewrole dispatchers: the caller and
//! identity-store model, the operation registry and role/permission
//! catalogs, settings, and the pure role-resolution function.
//!
//! Nothing in this crate dispatches anything; see `viewrole-rbac` for the
//! role and permission dispatchers.
//!
//! ## Usage
//!
//! ```rust
//! use viewrole_core::prelude::*;
//!
//! let store = MemoryStore::new()
//!     .with_user(User::new("alice").with_group("Admin"))
//!     .with_group("viewer")
//!     .with_permission("can_edit");
//!
//! let catalogs = Catalogs::load(&Settings::default(), &store).unwrap();
//! let alice = store.user("alice").unwrap().unwrap();
//!
//! let role = resolve_role(alice.group_names(), &catalogs.roles).unwrap();
//! assert_eq!(role, Some(RoleName::new("admin")));
//! ```

pub mod catalog;
pub mod error;
pub mod identity;
pub mod resolve;
pub mod settings;

pub use error::{Error, Result};

/// Common imports
pub mod prelude {
    pub use crate::catalog::{
        Catalogs, DEFAULT_OPERATIONS, Operation, OperationRegistry, PermissionCatalog,
        RoleCatalog, RoleName, specialized_name,
    };
    pub use crate::error::{Error, Result};
    pub use crate::identity::{Anonymous, Caller, IdentityStore, MemoryStore, User};
    pub use crate::resolve::{AmbiguousRole, resolve_role, resolve_role_with_policy};
    pub use crate::settings::{RolePolicy, Settings};
}
