//! Process-wide dispatch settings.
//!
//! Settings use the upper-case names a host framework's settings module
//! would carry, both as JSON keys and as environment variables:
//!
//! - `VIEWSET_METHOD_REGISTRY`: operations eligible for specialization
//! - `ROLE_GROUPS`: recognized role groups
//! - `ROLE_POLICY`: `strict` or `priority`, see [`RolePolicy`]
//!
//! Environment values are comma-separated lists (a JSON array is accepted
//! too).

use crate::catalog::Operation;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const VIEWSET_METHOD_REGISTRY: &str = "VIEWSET_METHOD_REGISTRY";
pub const ROLE_GROUPS: &str = "ROLE_GROUPS";
pub const ROLE_POLICY: &str = "ROLE_POLICY";

/// What to do when a caller belongs to several configured role groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolePolicy {
    /// Several roles are ambiguous: fall back to the base handler
    #[default]
    Strict,
    /// The first matching role in `ROLE_GROUPS` order wins
    Priority,
}

impl FromStr for RolePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(RolePolicy::Strict),
            "priority" => Ok(RolePolicy::Priority),
            other => Err(Error::configuration(format!(
                "Unknown {} '{}': expected 'strict' or 'priority'",
                ROLE_POLICY, other
            ))),
        }
    }
}

impl fmt::Display for RolePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RolePolicy::Strict => write!(f, "strict"),
            RolePolicy::Priority => write!(f, "priority"),
        }
    }
}

/// Dispatch settings. Unset fields take their documented defaults when
/// the catalogs are loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(
        rename = "VIEWSET_METHOD_REGISTRY",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub viewset_method_registry: Option<Vec<String>>,

    #[serde(rename = "ROLE_GROUPS", default, skip_serializing_if = "Option::is_none")]
    pub role_groups: Option<Vec<String>>,

    #[serde(rename = "ROLE_POLICY", default, skip_serializing_if = "Option::is_none")]
    pub role_policy: Option<RolePolicy>,
}

impl Settings {
    /// Effective role policy
    pub fn policy(&self) -> RolePolicy {
        self.role_policy.unwrap_or_default()
    }

    /// Load settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("Failed to read settings file: {}", e))
        })?;

        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            Error::configuration(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(path, content).map_err(|e| {
            Error::configuration(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }

    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let role_policy = match lookup(ROLE_POLICY) {
            Some(value) => Some(value.parse()?),
            None => None,
        };

        Ok(Self {
            viewset_method_registry: lookup(VIEWSET_METHOD_REGISTRY)
                .map(|v| parse_list(VIEWSET_METHOD_REGISTRY, &v))
                .transpose()?,
            role_groups: lookup(ROLE_GROUPS)
                .map(|v| parse_list(ROLE_GROUPS, &v))
                .transpose()?,
            role_policy,
        })
    }

    /// Overlay `other` on top of `self`; set fields in `other` win
    pub fn merge(self, other: Settings) -> Settings {
        Settings {
            viewset_method_registry: other
                .viewset_method_registry
                .or(self.viewset_method_registry),
            role_groups: other.role_groups.or(self.role_groups),
            role_policy: other.role_policy.or(self.role_policy),
        }
    }

    /// Settings file (if any) with environment overrides applied
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Settings file (if any) with overrides from `lookup` applied, validated
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading settings file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        let settings = base.merge(Self::from_vars(lookup)?);
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if let Some(registry) = &self.viewset_method_registry {
            if registry.is_empty() {
                return Err(Error::configuration(format!(
                    "{} is set but empty",
                    VIEWSET_METHOD_REGISTRY
                )));
            }
            for name in registry {
                Operation::new(name).map_err(|e| {
                    Error::configuration(format!("{}: {}", VIEWSET_METHOD_REGISTRY, e))
                })?;
            }
        }

        if let Some(groups) = &self.role_groups
            && groups.iter().any(|g| g.trim().is_empty())
        {
            return Err(Error::configuration(format!(
                "{} contains an empty group name",
                ROLE_GROUPS
            )));
        }

        Ok(())
    }
}

fn parse_list(name: &str, value: &str) -> Result<Vec<String>> {
    let value = value.trim();
    if value.starts_with('[') {
        return serde_json::from_str(value)
            .map_err(|e| Error::configuration(format!("Failed to parse {}: {}", name, e)));
    }

    Ok(value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_settings_json_keys() {
        let settings: Settings = serde_json::from_str(
            r#"{"VIEWSET_METHOD_REGISTRY": ["list"], "ROLE_GROUPS": ["admin"], "ROLE_POLICY": "priority"}"#,
        )
        .unwrap();

        assert_eq!(settings.viewset_method_registry, Some(vec!["list".to_string()]));
        assert_eq!(settings.role_groups, Some(vec!["admin".to_string()]));
        assert_eq!(settings.policy(), RolePolicy::Priority);

        let empty: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, Settings::default());
        assert_eq!(empty.policy(), RolePolicy::Strict);
    }

    #[test]
    fn test_settings_file_operations() {
        let settings = Settings {
            viewset_method_registry: Some(vec!["get_queryset".to_string()]),
            role_groups: None,
            role_policy: Some(RolePolicy::Priority),
        };
        let temp_file = NamedTempFile::new().unwrap();

        settings.to_file(temp_file.path()).unwrap();
        let loaded = Settings::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_settings_file_errors() {
        assert!(matches!(
            Settings::from_file("/no/such/settings.json"),
            Err(Error::Configuration(_))
        ));

        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "not json").unwrap();
        assert!(matches!(
            Settings::from_file(temp_file.path()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_from_vars() {
        let env = vars(&[
            (VIEWSET_METHOD_REGISTRY, "list, update,,"),
            (ROLE_GROUPS, r#"["Admin", "viewer"]"#),
            (ROLE_POLICY, " Priority "),
        ]);
        let settings = Settings::from_vars(|k| env.get(k).cloned()).unwrap();

        assert_eq!(
            settings.viewset_method_registry,
            Some(vec!["list".to_string(), "update".to_string()])
        );
        assert_eq!(
            settings.role_groups,
            Some(vec!["Admin".to_string(), "viewer".to_string()])
        );
        assert_eq!(settings.role_policy, Some(RolePolicy::Priority));
    }

    #[test]
    fn test_from_vars_bad_policy() {
        let env = vars(&[(ROLE_POLICY, "random")]);
        assert!(Settings::from_vars(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn test_merge_prefers_other() {
        let file = Settings {
            viewset_method_registry: Some(vec!["list".to_string()]),
            role_groups: Some(vec!["admin".to_string()]),
            role_policy: None,
        };
        let env = Settings {
            viewset_method_registry: None,
            role_groups: Some(vec!["viewer".to_string()]),
            role_policy: Some(RolePolicy::Priority),
        };

        let merged = file.merge(env);
        assert_eq!(merged.viewset_method_registry, Some(vec!["list".to_string()]));
        assert_eq!(merged.role_groups, Some(vec!["viewer".to_string()]));
        assert_eq!(merged.policy(), RolePolicy::Priority);
    }

    #[test]
    fn test_validation() {
        assert!(Settings::default().validate().is_ok());

        let empty_registry = Settings {
            viewset_method_registry: Some(Vec::new()),
            ..Settings::default()
        };
        assert!(empty_registry.validate().is_err());

        let bad_operation = Settings {
            viewset_method_registry: Some(vec!["perform create".to_string()]),
            ..Settings::default()
        };
        assert!(bad_operation.validate().is_err());

        let blank_group = Settings {
            role_groups: Some(vec!["admin".to_string(), "  ".to_string()]),
            ..Settings::default()
        };
        assert!(blank_group.validate().is_err());
    }

    #[test]
    fn test_load_with_overrides_file() {
        let file = Settings {
            viewset_method_registry: Some(vec!["list".to_string()]),
            role_groups: Some(vec!["admin".to_string()]),
            role_policy: Some(RolePolicy::Priority),
        };
        let temp_file = NamedTempFile::new().unwrap();
        file.to_file(temp_file.path()).unwrap();

        let env = vars(&[(ROLE_GROUPS, "viewer, editor")]);
        let settings =
            Settings::load_with(Some(temp_file.path()), |k| env.get(k).cloned()).unwrap();

        assert_eq!(settings.viewset_method_registry, Some(vec!["list".to_string()]));
        assert_eq!(
            settings.role_groups,
            Some(vec!["viewer".to_string(), "editor".to_string()])
        );
        assert_eq!(settings.policy(), RolePolicy::Priority);

        let defaults = Settings::load_with(None, |_| None).unwrap();
        assert_eq!(defaults, Settings::default());
    }

    #[test]
    fn test_load_with_validates_merged_result() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            r#"{"VIEWSET_METHOD_REGISTRY": ["list"]}"#,
        )
        .unwrap();

        let env = vars(&[(VIEWSET_METHOD_REGISTRY, "list, not valid")]);
        assert!(matches!(
            Settings::load_with(Some(temp_file.path()), |k| env.get(k).cloned()),
            Err(Error::Configuration(_))
        ));

        assert!(matches!(
            Settings::load_with(Some(Path::new("/no/such/settings.json")), |_| None),
            Err(Error::Configuration(_))
        ));
    }
}
