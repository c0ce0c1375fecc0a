//! Permission dispatch integration tests
//!
//! Covers the slot table, permission-qualified handlers, and permission
//! dispatch stacked on top of role dispatch.

use anyhow::Result;
use std::sync::Arc;
use viewrole::prelude::*;

struct Documents;

impl ViewSet for Documents {
    fn name(&self) -> &str {
        "documents"
    }

    fn call_default(&self, operation: &str, request: &Request<'_>) -> viewrole::core::Result<Value> {
        match operation {
            "update" => Ok(json!("base update")),
            "get_queryset" => Ok(json!(["shared"])),
            "perform_destroy" => {
                let id: u64 = request.param("id")?;
                Ok(json!({ "archived": id }))
            }
            other => Err(Error::method_not_found(other)),
        }
    }
}

#[viewset]
impl Documents {
    fn update_for_can_publish(&self, _request: &Request<'_>) -> viewrole::core::Result<Value> {
        Ok(json!("publish update"))
    }

    fn get_queryset_for_can_audit(&self, _request: &Request<'_>) -> viewrole::core::Result<Value> {
        Ok(json!(["shared", "private"]))
    }

    fn perform_destroy_for_can_purge(&self, request: &Request<'_>) -> viewrole::core::Result<Value> {
        let id: u64 = request.param("id")?;
        Ok(json!({ "purged": id }))
    }

    fn get_queryset_for_admin(&self, _request: &Request<'_>) -> viewrole::core::Result<Value> {
        Ok(json!(["shared", "private", "trash"]))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[test]
fn test_held_permission_without_handler_gets_base() -> Result<()> {
    init_tracing();
    let dispatcher = PermissionDispatcher::<Documents>::builder()
        .with_operations(&["update"])
        .with_permissions(&["can_edit"])
        .build()?;
    let caller = User::new("erin").with_permission("can_edit");

    let result = dispatcher.dispatch(&Documents, "update", &Request::new(&caller))?;
    assert_eq!(result, json!("base update"));
    Ok(())
}

#[test]
fn test_slot_for_every_pair() -> Result<()> {
    let store = MemoryStore::new()
        .with_permission("can_edit")
        .with_permission("can_publish")
        .with_permission("can_audit");
    let catalogs = Catalogs::load(&Settings::default(), &store)?;
    let dispatcher = PermissionDispatcher::<Documents>::from_catalogs(&catalogs)?;

    assert_eq!(dispatcher.slots().count(), 5 * 3);
    for operation in DEFAULT_OPERATIONS {
        for permission in ["can_edit", "can_publish", "can_audit"] {
            let slot = dispatcher
                .slot(operation, permission)
                .ok_or_else(|| anyhow::anyhow!("missing slot {}/{}", operation, permission))?;
            assert_eq!(slot.operation(), operation);
            assert_eq!(slot.permission(), permission);
            assert_eq!(slot.name(), specialized_name(operation, permission));
        }
    }

    let overridden: Vec<&str> = dispatcher
        .slots()
        .filter(|slot| slot.is_overridden())
        .map(|slot| slot.name())
        .collect();
    assert_eq!(overridden, vec!["get_queryset_for_can_audit"]);
    Ok(())
}

#[test]
fn test_holding_and_lacking_permissions() -> Result<()> {
    init_tracing();
    let dispatcher = PermissionDispatcher::<Documents>::builder()
        .with_operations(&["update", "get_queryset"])
        .with_permissions(&["can_publish", "can_audit"])
        .with_audit_logging(true)
        .build()?;

    let publisher = User::new("pat").with_permission("can_publish");
    let auditor = User::new("ada").with_permission("can_audit");
    let guest = User::new("gus");

    assert_eq!(
        dispatcher.dispatch(&Documents, "update", &Request::new(&publisher))?,
        json!("publish update")
    );
    assert_eq!(
        dispatcher.dispatch(&Documents, "get_queryset", &Request::new(&publisher))?,
        json!(["shared"])
    );
    assert_eq!(
        dispatcher.dispatch(&Documents, "get_queryset", &Request::new(&auditor))?,
        json!(["shared", "private"])
    );
    assert_eq!(
        dispatcher.dispatch(&Documents, "update", &Request::new(&guest))?,
        json!("base update")
    );
    Ok(())
}

#[test]
fn test_superuser_holds_every_permission() -> Result<()> {
    let dispatcher = PermissionDispatcher::<Documents>::builder()
        .with_operations(&["update"])
        .with_permissions(&["can_edit", "can_publish"])
        .build()?;

    let root = User::new("root").superuser();
    assert_eq!(
        dispatcher.dispatch(&Documents, "update", &Request::new(&root))?,
        json!("publish update")
    );

    let retired = User::new("root").superuser().inactive();
    assert_eq!(
        dispatcher.dispatch(&Documents, "update", &Request::new(&retired))?,
        json!("base update")
    );
    Ok(())
}

#[test]
fn test_dispatch_for_named_permission() -> Result<()> {
    let dispatcher = PermissionDispatcher::<Documents>::builder()
        .with_operations(&["perform_destroy"])
        .with_permissions(&["can_purge", "can_edit"])
        .build()?;
    let caller = User::new("pam").with_permissions(&["can_purge", "can_edit"]);
    let request = Request::new(&caller).with_params(json!({ "id": 7 }));

    assert_eq!(
        dispatcher.dispatch_for(&Documents, "perform_destroy", "can_purge", &request)?,
        json!({ "purged": 7 })
    );
    assert_eq!(
        dispatcher.dispatch_for(&Documents, "perform_destroy", "can_edit", &request)?,
        json!({ "archived": 7 })
    );
    // Unknown permissions have no slot, even when a handler is defined under that name.
    assert!(matches!(
        dispatcher.resolve_for("get_queryset", "admin", &caller),
        Resolution::NotApplicable(FallbackReason::Unregistered)
    ));
    assert!(matches!(
        dispatcher.resolve_for("perform_destroy", "can_audit", &caller),
        Resolution::NotApplicable(FallbackReason::NoPermissionSlot)
    ));
    Ok(())
}

#[test]
fn test_specialized_handler_errors_propagate() -> Result<()> {
    let dispatcher = PermissionDispatcher::<Documents>::builder()
        .with_operations(&["perform_destroy"])
        .with_permissions(&["can_purge"])
        .build()?;
    let caller = User::new("pam").with_permission("can_purge");

    let result = dispatcher.dispatch(&Documents, "perform_destroy", &Request::new(&caller));
    assert!(matches!(result, Err(Error::InvalidParams(_))));
    Ok(())
}

#[test]
fn test_permission_then_role_then_base() -> Result<()> {
    init_tracing();
    let metrics = Arc::new(MetricsMiddleware::new());

    let roles = RoleDispatcher::<Documents>::builder()
        .with_operations(&["get_queryset"])
        .with_roles(&["admin", "staff"])
        .build()?;
    let dispatcher = PermissionDispatcher::<Documents>::builder()
        .with_operations(&["get_queryset"])
        .with_permissions(&["can_audit"])
        .with_fallback(roles)
        .with_middleware(metrics.clone())
        .build()?;

    let auditing_admin = User::new("ann")
        .with_group("admin")
        .with_permission("can_audit");
    let admin = User::new("alice").with_group("admin");
    let ambiguous = User::new("bob").with_groups(&["admin", "staff"]);

    assert_eq!(
        dispatcher.dispatch(&Documents, "get_queryset", &Request::new(&auditing_admin))?,
        json!(["shared", "private"])
    );
    assert_eq!(
        dispatcher.dispatch(&Documents, "get_queryset", &Request::new(&admin))?,
        json!(["shared", "private", "trash"])
    );
    assert_eq!(
        dispatcher.dispatch(&Documents, "get_queryset", &Request::new(&ambiguous))?,
        json!(["shared"])
    );

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.specialized.get("get_queryset_for_can_audit"), Some(&1));
    assert_eq!(snapshot.fallback_reasons.get("permission_not_held"), Some(&2));
    Ok(())
}
