//! Settings and catalog loading tests

use anyhow::Result;
use tempfile::TempDir;
use viewrole::core::settings::{ROLE_GROUPS, ROLE_POLICY, VIEWSET_METHOD_REGISTRY};
use viewrole::prelude::*;

struct Reports;

impl ViewSet for Reports {
    fn call_default(&self, operation: &str, _request: &Request<'_>) -> viewrole::core::Result<Value> {
        match operation {
            "export" => Ok(json!("csv")),
            other => Err(Error::method_not_found(other)),
        }
    }
}

#[viewset]
impl Reports {
    fn export_for_finance(&self, _request: &Request<'_>) -> viewrole::core::Result<Value> {
        Ok(json!("xlsx"))
    }

    fn export_for_can_export_pdf(&self, _request: &Request<'_>) -> viewrole::core::Result<Value> {
        Ok(json!("pdf"))
    }
}

const STORE: &str = r#"{
    "groups": ["Finance", "Sales", "Support"],
    "permissions": ["can_export_pdf"],
    "users": [
        {"id": "fay", "groups": ["finance"]},
        {"id": "sol", "groups": ["sales", "finance"]},
        {"id": "pia", "groups": ["support"], "permissions": ["can_export_pdf"]},
        {"id": "old", "groups": ["finance"], "permissions": ["can_export_pdf"], "is_active": false}
    ]
}"#;

#[test]
fn test_settings_file_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("viewrole.json");

    let settings = Settings {
        viewset_method_registry: Some(vec!["export".to_string()]),
        role_groups: Some(vec!["finance".to_string(), "sales".to_string()]),
        role_policy: Some(RolePolicy::Priority),
    };
    settings.to_file(&path)?;

    let written = std::fs::read_to_string(&path)?;
    assert!(written.contains(VIEWSET_METHOD_REGISTRY));
    assert!(written.contains(ROLE_GROUPS));
    assert!(written.contains("\"priority\""));

    assert_eq!(Settings::from_file(&path)?, settings);
    Ok(())
}

#[test]
fn test_missing_and_malformed_files() -> Result<()> {
    let dir = TempDir::new()?;

    let missing = Settings::from_file(dir.path().join("absent.json"));
    assert!(matches!(missing, Err(Error::Configuration(_))));

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json")?;
    assert!(matches!(Settings::from_file(&path), Err(Error::Configuration(_))));

    std::fs::write(&path, r#"{"ROLE_POLICY": "loose"}"#)?;
    assert!(Settings::from_file(&path).is_err());
    Ok(())
}

#[test]
fn test_environment_overrides_file() -> Result<()> {
    let file = Settings {
        viewset_method_registry: Some(vec!["export".to_string()]),
        role_groups: Some(vec!["finance".to_string()]),
        role_policy: None,
    };
    let env = Settings::from_vars(|name| match name {
        n if n == ROLE_GROUPS => Some("finance, sales".to_string()),
        n if n == ROLE_POLICY => Some("Priority".to_string()),
        _ => None,
    })?;

    let merged = file.merge(env);
    merged.validate()?;
    assert_eq!(merged.viewset_method_registry, Some(vec!["export".to_string()]));
    assert_eq!(
        merged.role_groups,
        Some(vec!["finance".to_string(), "sales".to_string()])
    );
    assert_eq!(merged.policy(), RolePolicy::Priority);
    Ok(())
}

#[test]
fn test_load_with_file_and_overrides() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"ROLE_GROUPS": ["finance ", " sales"]}"#)?;

    let settings = Settings::load_with(Some(path.as_path()), |name| {
        (name == VIEWSET_METHOD_REGISTRY).then(|| "export".to_string())
    })?;
    assert_eq!(settings.viewset_method_registry, Some(vec!["export".to_string()]));

    let store = MemoryStore::new();
    let catalogs = Catalogs::load(&settings, &store)?;
    assert!(catalogs.roles.contains("finance"));

    let dispatcher = RoleDispatcher::<Reports>::from_catalogs(&catalogs, settings.policy())?;
    let fay = User::new("fay").with_group("finance");
    let result = dispatcher.dispatch(&Reports, "export", &Request::new(&fay))?;
    assert_eq!(result, json!("xlsx"));

    std::fs::write(&path, r#"{"ROLE_GROUPS": ["finance", "  "]}"#)?;
    let blank = Settings::load_with(Some(path.as_path()), |_| None);
    assert!(matches!(blank, Err(Error::Configuration(_))));
    Ok(())
}

#[test]
fn test_invalid_settings_rejected() {
    let empty_registry = Settings {
        viewset_method_registry: Some(Vec::new()),
        ..Settings::default()
    };
    assert!(matches!(empty_registry.validate(), Err(Error::Configuration(_))));

    let bad_operation = Settings {
        viewset_method_registry: Some(vec!["export all".to_string()]),
        ..Settings::default()
    };
    assert!(bad_operation.validate().is_err());

    let store = MemoryStore::new();
    assert!(Catalogs::load(&bad_operation, &store).is_err());
}

#[test]
fn test_store_file_drives_dispatch() -> Result<()> {
    let dir = TempDir::new()?;
    let store_path = dir.path().join("store.json");
    let settings_path = dir.path().join("settings.json");
    std::fs::write(&store_path, STORE)?;
    std::fs::write(
        &settings_path,
        r#"{"VIEWSET_METHOD_REGISTRY": ["export"], "ROLE_GROUPS": ["finance", "sales"]}"#,
    )?;

    let store = MemoryStore::from_file(&store_path)?;
    let settings = Settings::from_file(&settings_path)?;
    let catalogs = Catalogs::load(&settings, &store)?;
    assert_eq!(catalogs.roles.len(), 2);
    assert!(catalogs.permissions.contains("can_export_pdf"));

    let roles = RoleDispatcher::<Reports>::from_catalogs(&catalogs, settings.policy())?;
    let dispatcher = PermissionDispatcher::<Reports>::builder()
        .with_catalogs(&catalogs)
        .with_fallback(roles)
        .build()?;

    let expected = [("fay", "xlsx"), ("sol", "csv"), ("pia", "pdf"), ("old", "xlsx")];
    for (id, format) in expected {
        let user = store
            .user(id)?
            .ok_or_else(|| anyhow::anyhow!("user {} missing", id))?;
        let result = dispatcher.dispatch(&Reports, "export", &Request::new(&user))?;
        assert_eq!(result, json!(format), "unexpected export for {}", id);
    }
    Ok(())
}

#[test]
fn test_unreadable_store_file() {
    let result = MemoryStore::from_file("/nonexistent/viewrole/store.json");
    assert!(matches!(result, Err(Error::Store(_))));
}
