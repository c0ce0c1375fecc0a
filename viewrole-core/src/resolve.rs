//! Role resolution.
//!
//! A caller's role is the intersection of its group names with the role
//! catalog, compared case-insensitively. Exactly one match resolves; no
//! match resolves to `None`; several matches are ambiguous unless the
//! [`RolePolicy::Priority`] policy is in effect.

use crate::catalog::{RoleCatalog, RoleName};
use crate::settings::RolePolicy;
use std::collections::HashSet;
use thiserror::Error;

/// The caller belongs to more than one configured role group.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("caller belongs to {} role groups: {}", .roles.len(), join(.roles))]
pub struct AmbiguousRole {
    /// Matching roles, in catalog order
    pub roles: Vec<RoleName>,
}

fn join(roles: &[RoleName]) -> String {
    roles
        .iter()
        .map(RoleName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Roles from `catalog` the caller holds, in catalog order.
pub fn matching_roles<I, S>(groups: I, catalog: &RoleCatalog) -> Vec<RoleName>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let held: HashSet<String> = groups
        .into_iter()
        .map(|g| g.as_ref().to_lowercase())
        .collect();

    catalog
        .iter()
        .filter(|role| held.contains(role.as_str()))
        .cloned()
        .collect()
}

/// Resolve the single role a caller holds.
///
/// # Examples
///
/// ```rust
/// use viewrole_core::catalog::{RoleCatalog, RoleName};
/// use viewrole_core::resolve::resolve_role;
///
/// let roles = RoleCatalog::new(["admin", "viewer"]);
///
/// assert_eq!(resolve_role(["Admin", "staff"], &roles), Ok(Some(RoleName::new("admin"))));
/// assert_eq!(resolve_role(["staff"], &roles), Ok(None));
/// assert!(resolve_role(["admin", "viewer"], &roles).is_err());
/// ```
pub fn resolve_role<I, S>(
    groups: I,
    catalog: &RoleCatalog,
) -> Result<Option<RoleName>, AmbiguousRole>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    resolve_role_with_policy(groups, catalog, RolePolicy::Strict)
}

/// Resolve a caller's role under an explicit ambiguity policy.
pub fn resolve_role_with_policy<I, S>(
    groups: I,
    catalog: &RoleCatalog,
    policy: RolePolicy,
) -> Result<Option<RoleName>, AmbiguousRole>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut roles = matching_roles(groups, catalog);
    match (roles.len(), policy) {
        (0, _) => Ok(None),
        (1, _) | (_, RolePolicy::Priority) => Ok(Some(roles.swap_remove(0))),
        _ => Err(AmbiguousRole { roles }),
    }
}
