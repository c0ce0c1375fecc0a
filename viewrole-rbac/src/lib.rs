//! Role- and permission-qualified dispatch for viewrole view sets
//!
//! This crate selects, per call, between a view set's base implementation
//! of an operation and a specialized handler named after the caller's role
//! or one of its permissions.
//!
//! # Features
//!
//! - **Role dispatch**: `<operation>_for_<role>` when the caller belongs to
//!   exactly one configured role group
//! - **Permission dispatch**: `<operation>_for_<permission>` from a slot table
//!   built once per dispatcher
//! - **Composable**: dispatchers stack through their fallback, ending at the
//!   view set's base implementation
//! - **Audit Logging**: optional info-level log of every decision
//!
//! # Quick Start
//!
//! ```rust
//! use viewrole_rbac::prelude::*;
//!
//! let view = FnViewSet::new("articles")
//!     .with_default("list", |_| Ok(json!("everyone")));
//!
//! let roles = RoleDispatcher::<FnViewSet>::builder()
//!     .with_operations(&["list"])
//!     .with_roles(&["admin", "viewer"])
//!     .with_handler("list_for_admin", |_, _| Ok(json!("admins")))
//!     .with_audit_logging(true)
//!     .build()
//!     .unwrap();
//!
//! // Permission handlers win; anything they leave goes to the role dispatcher.
//! let dispatcher = PermissionDispatcher::<FnViewSet>::builder()
//!     .with_operations(&["list"])
//!     .with_permissions(&["can_audit"])
//!     .with_handler("list_for_can_audit", |_, _| Ok(json!("auditors")))
//!     .with_fallback(roles)
//!     .build()
//!     .unwrap();
//!
//! let auditor = User::new("ann").with_group("admin").with_permission("can_audit");
//! let admin = User::new("alice").with_group("admin");
//! let guest = User::new("gus");
//!
//! assert_eq!(dispatcher.dispatch(&view, "list", &Request::new(&auditor)).unwrap(), json!("auditors"));
//! assert_eq!(dispatcher.dispatch(&view, "list", &Request::new(&admin)).unwrap(), json!("admins"));
//! assert_eq!(dispatcher.dispatch(&view, "list", &Request::new(&guest)).unwrap(), json!("everyone"));
//! ```

pub mod builder;
pub mod error;
pub mod permission;
pub mod resolution;
pub mod role;

pub mod prelude {
    //! Common imports for viewrole RBAC

    pub use crate::builder::{PermissionDispatcherBuilder, RoleDispatcherBuilder};
    pub use crate::error::{RbacError, RbacResult};
    pub use crate::permission::{PermissionDispatcher, PermissionSlot};
    pub use crate::resolution::{Resolution, dispatch_resolved};
    pub use crate::role::RoleDispatcher;

    pub use viewrole_viewset::prelude::*;
}

// Re-export major components at crate level
pub use error::{RbacError, RbacResult};
pub use permission::PermissionDispatcher;
pub use resolution::Resolution;
pub use role::RoleDispatcher;
pub use viewrole_viewset::FallbackReason;
