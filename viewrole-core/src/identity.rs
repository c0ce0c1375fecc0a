//! Caller identities and the identity store they come from.
//!
//! viewrole never owns identity data. A [`Caller`] is whatever the host
//! framework authenticated; an [`IdentityStore`] is queried once at startup
//! to enumerate the group and permission catalogs.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// An authenticated (or anonymous) caller, as seen by dispatch.
pub trait Caller: Send + Sync {
    /// Stable identifier, used only for logging.
    fn id(&self) -> &str;

    /// Names of the groups the caller belongs to, as stored.
    fn group_names(&self) -> Vec<&str>;

    /// Whether the caller holds the named permission.
    fn has_permission(&self, permission: &str) -> bool;
}

fn default_active() -> bool {
    true
}

/// Stored user record.
///
/// Permission checks follow the usual host-framework rules: an inactive
/// user holds nothing, an active superuser holds everything. Group
/// membership is reported regardless of either flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user
    pub id: String,
    /// Group memberships
    #[serde(default)]
    pub groups: BTreeSet<String>,
    /// Directly granted permissions
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    /// Inactive users hold no permissions
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Active superusers hold every permission
    #[serde(default)]
    pub is_superuser: bool,
}

impl User {
    /// Create an active user with no groups and no permissions
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            groups: BTreeSet::new(),
            permissions: BTreeSet::new(),
            is_active: true,
            is_superuser: false,
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.groups.insert(group.to_string());
        self
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups.extend(groups.iter().map(|g| g.to_string()));
        self
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions.insert(permission.to_string());
        self
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions
            .extend(permissions.iter().map(|p| p.to_string()));
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }
}

impl Caller for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(String::as_str).collect()
    }

    fn has_permission(&self, permission: &str) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_superuser || self.permissions.contains(permission)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.id)
    }
}

/// Unauthenticated caller: no groups, no permissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl Caller for Anonymous {
    fn id(&self) -> &str {
        "anonymous"
    }

    fn group_names(&self) -> Vec<&str> {
        Vec::new()
    }

    fn has_permission(&self, _permission: &str) -> bool {
        false
    }
}

/// Read-only view of the external identity store.
pub trait IdentityStore: Send + Sync {
    /// Every group name known to the store
    fn group_names(&self) -> Result<Vec<String>>;

    /// Every permission name known to the store
    fn permission_names(&self) -> Result<Vec<String>>;

    /// Look up a stored user
    fn user(&self, id: &str) -> Result<Option<User>>;
}

/// In-memory identity store, mostly for tests and demos.
///
/// # Examples
///
/// ```rust
/// use viewrole_core::identity::{IdentityStore, MemoryStore, User};
///
/// let store = MemoryStore::new()
///     .with_group("editors")
///     .with_user(User::new("alice").with_group("admins"));
///
/// assert_eq!(store.group_names().unwrap(), vec!["editors", "admins"]);
/// assert!(store.user("alice").unwrap().is_some());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default)]
    users: Vec<User>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.add_group(group);
        self
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.add_permission(permission);
        self
    }

    /// Add a user; its groups and permissions join the catalogs.
    pub fn with_user(mut self, user: User) -> Self {
        self.add_user(user);
        self
    }

    fn add_group(&mut self, group: &str) {
        if !self.groups.iter().any(|g| g == group) {
            self.groups.push(group.to_string());
        }
    }

    fn add_permission(&mut self, permission: &str) {
        if !self.permissions.iter().any(|p| p == permission) {
            self.permissions.push(permission.to_string());
        }
    }

    fn add_user(&mut self, user: User) {
        for group in &user.groups {
            self.add_group(group);
        }
        for permission in &user.permissions {
            self.add_permission(permission);
        }
        self.users.retain(|u| u.id != user.id);
        self.users.push(user);
    }

    /// Parse a store document: `{"groups": [...], "permissions": [...], "users": [...]}`
    pub fn from_json(content: &str) -> Result<Self> {
        let parsed: MemoryStore = serde_json::from_str(content)?;

        // Re-insert users so their memberships land in the catalogs.
        let mut store = MemoryStore {
            groups: Vec::new(),
            permissions: Vec::new(),
            users: Vec::new(),
        };
        for group in &parsed.groups {
            store.add_group(group);
        }
        for permission in &parsed.permissions {
            store.add_permission(permission);
        }
        for user in parsed.users {
            store.add_user(user);
        }
        Ok(store)
    }

    /// Load a store document from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::store(format!(
                "Failed to read identity store {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }
}

impl IdentityStore for MemoryStore {
    fn group_names(&self) -> Result<Vec<String>> {
        Ok(self.groups.clone())
    }

    fn permission_names(&self) -> Result<Vec<String>> {
        Ok(self.permissions.clone())
    }

    fn user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }
}
