//! Operation registry and the role/permission catalogs.
//!
//! All three are built once at startup and never mutated afterwards.

use crate::error::{Error, Result};
use crate::identity::IdentityStore;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// View-set operations that are specializable when nothing is configured.
pub const DEFAULT_OPERATIONS: [&str; 5] = [
    "get_queryset",
    "get_serializer_class",
    "perform_create",
    "perform_update",
    "perform_destroy",
];

/// Separator between an operation and its role or permission qualifier.
pub const QUALIFIER_SEPARATOR: &str = "_for_";

/// Build the handler name `<operation>_for_<qualifier>`.
///
/// # Examples
///
/// ```rust
/// use viewrole_core::catalog::specialized_name;
///
/// assert_eq!(specialized_name("get_queryset", "admin"), "get_queryset_for_admin");
/// ```
pub fn specialized_name(operation: &str, qualifier: &str) -> String {
    format!("{}{}{}", operation, QUALIFIER_SEPARATOR, qualifier)
}

/// A validated operation name: a non-empty ASCII identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Operation(String);

impl Operation {
    pub fn new(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_start || !valid_rest {
            return Err(Error::validation(format!(
                "Invalid operation name '{}': expected an identifier",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The handler name for this operation under `qualifier`
    pub fn qualified(&self, qualifier: &str) -> String {
        specialized_name(&self.0, qualifier)
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Operation {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Operation> for String {
    fn from(value: Operation) -> Self {
        value.0
    }
}

impl Borrow<str> for Operation {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Operation {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The whitelist of operations eligible for specialization.
///
/// Order-preserving and de-duplicated.
///
/// # Examples
///
/// ```rust
/// use viewrole_core::catalog::OperationRegistry;
///
/// let registry = OperationRegistry::default();
/// assert!(registry.contains("perform_create"));
/// assert!(!registry.contains("list"));
///
/// let custom = OperationRegistry::new(["list", "update", "list"]).unwrap();
/// assert_eq!(custom.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRegistry {
    operations: Vec<Operation>,
}

impl OperationRegistry {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut operations: Vec<Operation> = Vec::new();
        for name in names {
            let operation = Operation::new(name.as_ref())?;
            if !operations.contains(&operation) {
                operations.push(operation);
            }
        }
        Ok(Self { operations })
    }

    pub fn contains(&self, operation: &str) -> bool {
        self.get(operation).is_some()
    }

    pub fn get(&self, operation: &str) -> Option<&Operation> {
        self.operations.iter().find(|o| o.as_str() == operation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self {
            operations: DEFAULT_OPERATIONS
                .iter()
                .map(|name| Operation(name.to_string()))
                .collect(),
        }
    }
}

/// A role name, canonicalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for RoleName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recognized role groups. Catalog order doubles as priority order.
///
/// # Examples
///
/// ```rust
/// use viewrole_core::catalog::RoleCatalog;
///
/// let roles = RoleCatalog::new(["Admin", "viewer", "ADMIN"]);
/// assert_eq!(roles.len(), 2);
/// assert!(roles.contains("admin"));
/// assert!(roles.contains("VIEWER"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCatalog {
    roles: Vec<RoleName>,
}

impl RoleCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roles: Vec<RoleName> = Vec::new();
        for name in names {
            let role = RoleName::new(name.as_ref().trim());
            if role.as_str().is_empty() {
                warn!("Ignoring empty role group name");
                continue;
            }
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        Self { roles }
    }

    /// Case-insensitive membership test
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Priority of `name` (0 is highest), matched case-insensitively
    pub fn position(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.roles.iter().position(|r| r.as_str() == wanted)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleName> {
        self.roles.iter()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Known permission names, as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    permissions: Vec<String>,
}

impl PermissionCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut permissions: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if name.is_empty() {
                warn!("Ignoring empty permission name");
                continue;
            }
            if !permissions.iter().any(|p| p == name) {
                permissions.push(name.to_string());
            }
        }
        Self { permissions }
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

/// Everything dispatchers read at construction time.
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub registry: OperationRegistry,
    pub roles: RoleCatalog,
    pub permissions: PermissionCatalog,
}

impl Catalogs {
    /// Resolve settings against the identity store.
    ///
    /// `VIEWSET_METHOD_REGISTRY` falls back to [`DEFAULT_OPERATIONS`],
    /// `ROLE_GROUPS` falls back to every group in the store, and the
    /// permission catalog is always every permission in the store.
    pub fn load(settings: &Settings, store: &dyn IdentityStore) -> Result<Self> {
        settings.validate()?;

        let registry = match &settings.viewset_method_registry {
            Some(names) => OperationRegistry::new(names)?,
            None => OperationRegistry::default(),
        };

        let store_groups = store.group_names()?;
        let roles = match &settings.role_groups {
            Some(names) => {
                let roles = RoleCatalog::new(names);
                for role in roles.iter() {
                    if !store_groups
                        .iter()
                        .any(|g| g.to_lowercase() == role.as_str())
                    {
                        warn!(role = %role, "Configured role group is not present in the identity store");
                    }
                }
                roles
            }
            None => {
                debug!("ROLE_GROUPS not set, using every group in the identity store");
                RoleCatalog::new(&store_groups)
            }
        };

        let permissions = PermissionCatalog::new(store.permission_names()?);

        info!(
            operations = registry.len(),
            roles = roles.len(),
            permissions = permissions.len(),
            "Loaded dispatch catalogs"
        );

        Ok(Self {
            registry,
            roles,
            permissions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{MemoryStore, User};

    #[test]
    fn test_operation_validation() {
        assert!(Operation::new("perform_create").is_ok());
        assert!(Operation::new("_private").is_ok());
        assert!(Operation::new("").is_err());
        assert!(Operation::new("1list").is_err());
        assert!(Operation::new("get queryset").is_err());
        assert!(Operation::new("get-queryset").is_err());
    }

    #[test]
    fn test_operation_serde() {
        let op: Operation = serde_json::from_str("\"perform_update\"").unwrap();
        assert_eq!(op.qualified("editor"), "perform_update_for_editor");
        assert!(serde_json::from_str::<Operation>("\"not valid\"").is_err());
    }

    #[test]
    fn test_default_registry() {
        let registry = OperationRegistry::default();
        let names: Vec<&str> = registry.iter().map(Operation::as_str).collect();
        assert_eq!(names, DEFAULT_OPERATIONS.to_vec());
    }

    #[test]
    fn test_registry_rejects_bad_names() {
        assert!(OperationRegistry::new(["list", "bad name"]).is_err());
    }

    #[test]
    fn test_role_catalog_priority() {
        let roles = RoleCatalog::new(["Owner", "admin", "", "viewer"]);
        assert_eq!(roles.len(), 3);
        assert_eq!(roles.position("ADMIN"), Some(1));
        assert_eq!(roles.position("guest"), None);
    }

    #[test]
    fn test_role_catalog_trims_names() {
        let roles = RoleCatalog::new(["admin ", " Viewer", "  ", "admin"]);
        assert_eq!(roles.len(), 2);
        assert_eq!(roles.position("admin"), Some(0));
        assert_eq!(roles.position("viewer"), Some(1));
    }

    #[test]
    fn test_permission_catalog_is_case_sensitive() {
        let permissions = PermissionCatalog::new(["can_edit", "Can_Edit", "can_edit"]);
        assert_eq!(permissions.len(), 2);
        assert!(permissions.contains("Can_Edit"));
        assert!(!permissions.contains("CAN_EDIT"));
    }

    #[test]
    fn test_load_defaults_from_store() {
        let store = MemoryStore::new()
            .with_group("Admin")
            .with_group("viewer")
            .with_permission("can_edit");

        let catalogs = Catalogs::load(&Settings::default(), &store).unwrap();
        assert_eq!(catalogs.registry, OperationRegistry::default());
        assert!(catalogs.roles.contains("admin"));
        assert!(catalogs.roles.contains("viewer"));
        assert!(catalogs.permissions.contains("can_edit"));
    }

    #[test]
    fn test_load_with_configured_settings() {
        let store = MemoryStore::new()
            .with_user(User::new("a").with_groups(&["admin", "viewer", "staff"]));

        let settings = Settings {
            viewset_method_registry: Some(vec!["list".to_string()]),
            role_groups: Some(vec!["admin".to_string(), "viewer".to_string()]),
            ..Settings::default()
        };

        let catalogs = Catalogs::load(&settings, &store).unwrap();
        assert_eq!(catalogs.registry.len(), 1);
        assert!(catalogs.registry.contains("list"));
        assert_eq!(catalogs.roles.len(), 2);
        assert!(!catalogs.roles.contains("staff"));
    }
}
