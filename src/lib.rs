//! # viewrole - role- and permission-qualified dispatch for view sets
//!
//! Routes each operation on a view set to a handler specialized for the
//! caller's role or permission, falling back to the base implementation.
//!
//! This crate re-exports the functionality from the constituent crates:
//! - `viewrole-core`: identities, catalogs, settings and role resolution
//! - `viewrole-viewset`: the view-set traits, handler tables and middleware
//! - `viewrole-rbac`: the role and permission dispatchers
//! - `viewrole-macros`: the `#[viewset]` attribute

pub use viewrole_core as core;
pub use viewrole_macros::viewset;
pub use viewrole_rbac as rbac;
pub use viewrole_viewset as views;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::rbac::prelude::*;
    pub use viewrole_macros::viewset;
}
