//! Permission-qualified dispatch.
//!
//! At construction every (registered operation, known permission) pair gets
//! a slot named `<operation>_for_<permission>`. A slot is overridden when the
//! view-set type defines a handler under that name. The table is owned by
//! the dispatcher and never changes after `build()`.

use crate::builder::PermissionDispatcherBuilder;
use crate::error::RbacResult;
use crate::resolution::{Resolution, dispatch_resolved};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};
use viewrole_core::prelude::*;
use viewrole_viewset::middleware::MiddlewareStack;
use viewrole_viewset::{
    Dispatch, FallbackReason, Handler, Request, Specializations, Specialized, ViewSet,
};

/// One `(operation, permission)` entry of the slot table.
pub struct PermissionSlot<V> {
    operation: String,
    permission: String,
    name: String,
    handler: Option<Handler<V>>,
}

impl<V> PermissionSlot<V> {
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }

    /// `<operation>_for_<permission>`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the view-set type defines a handler for this slot
    pub fn is_overridden(&self) -> bool {
        self.handler.is_some()
    }

    pub fn handler(&self) -> Option<&Handler<V>> {
        self.handler.as_ref()
    }
}

impl<V> fmt::Debug for PermissionSlot<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionSlot")
            .field("name", &self.name)
            .field("overridden", &self.is_overridden())
            .finish()
    }
}

/// Dispatches registered operations to permission-qualified handlers.
///
/// # Examples
///
/// ```rust
/// use viewrole_rbac::prelude::*;
///
/// let view = FnViewSet::new("articles")
///     .with_default("update", |_| Ok(json!("base update")));
///
/// let dispatcher = PermissionDispatcher::<FnViewSet>::builder()
///     .with_operations(&["update"])
///     .with_permissions(&["can_edit", "can_publish"])
///     .with_handler("update_for_can_publish", |_, _| Ok(json!("publish")))
///     .build()
///     .unwrap();
///
/// assert!(dispatcher.slot("update", "can_edit").is_some());
///
/// let editor = User::new("erin").with_permission("can_edit");
/// let publisher = User::new("pat").with_permission("can_publish");
///
/// let request = Request::new(&editor);
/// assert_eq!(dispatcher.dispatch(&view, "update", &request).unwrap(), json!("base update"));
/// let request = Request::new(&publisher);
/// assert_eq!(dispatcher.dispatch(&view, "update", &request).unwrap(), json!("publish"));
/// ```
pub struct PermissionDispatcher<V> {
    pub(crate) registry: OperationRegistry,
    pub(crate) permissions: PermissionCatalog,
    pub(crate) slots: Vec<PermissionSlot<V>>,
    pub(crate) index: HashMap<(String, String), usize>,
    pub(crate) overridden: HashMap<String, Vec<usize>>,
    pub(crate) fallback: Box<dyn Dispatch<V>>,
    pub(crate) middleware: MiddlewareStack,
    pub(crate) audit_enabled: bool,
}

impl<V: ViewSet + Specialized> PermissionDispatcher<V> {
    /// Create a new permission dispatcher builder
    pub fn builder() -> PermissionDispatcherBuilder<V> {
        PermissionDispatcherBuilder::new()
    }

    /// Dispatcher over loaded catalogs with the default fallback
    pub fn from_catalogs(catalogs: &Catalogs) -> RbacResult<Self> {
        Self::builder().with_catalogs(catalogs).build()
    }

    /// Build the slot table for `registry` x `permissions`
    pub(crate) fn slot_table(
        registry: &OperationRegistry,
        permissions: &PermissionCatalog,
        handlers: &Specializations<V>,
    ) -> (
        Vec<PermissionSlot<V>>,
        HashMap<(String, String), usize>,
        HashMap<String, Vec<usize>>,
    ) {
        let mut slots = Vec::with_capacity(registry.len() * permissions.len());
        let mut index = HashMap::new();
        let mut overridden: HashMap<String, Vec<usize>> = HashMap::new();

        for operation in registry.iter() {
            for permission in permissions.iter() {
                let name = operation.qualified(permission);
                let handler = handlers.get(&name).cloned();
                let position = slots.len();

                if handler.is_some() {
                    overridden
                        .entry(operation.to_string())
                        .or_default()
                        .push(position);
                }
                index.insert((operation.to_string(), permission.to_string()), position);
                slots.push(PermissionSlot {
                    operation: operation.to_string(),
                    permission: permission.to_string(),
                    name,
                    handler,
                });
            }
        }

        (slots, index, overridden)
    }

    /// The slot for `(operation, permission)`, if both are known
    pub fn slot(&self, operation: &str, permission: &str) -> Option<&PermissionSlot<V>> {
        self.index
            .get(&(operation.to_string(), permission.to_string()))
            .map(|&position| &self.slots[position])
    }

    /// Every slot, operations in registry order then permissions in catalog order
    pub fn slots(&self) -> impl Iterator<Item = &PermissionSlot<V>> {
        self.slots.iter()
    }

    pub fn slot_names(&self) -> Vec<&str> {
        self.slots.iter().map(PermissionSlot::name).collect()
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn permissions(&self) -> &PermissionCatalog {
        &self.permissions
    }

    /// Decide the handler for `operation` checked against one named permission.
    pub fn resolve_for(
        &self,
        operation: &str,
        permission: &str,
        caller: &dyn Caller,
    ) -> Resolution<'_, V> {
        if !self.registry.contains(operation) {
            return Resolution::NotApplicable(FallbackReason::Unregistered);
        }
        let Some(slot) = self.slot(operation, permission) else {
            return Resolution::NotApplicable(FallbackReason::NoPermissionSlot);
        };
        if !caller.has_permission(permission) {
            return Resolution::NotApplicable(FallbackReason::PermissionNotHeld);
        }
        match &slot.handler {
            Some(handler) => Resolution::Specialized {
                name: slot.name.clone(),
                handler,
            },
            None => Resolution::NotApplicable(FallbackReason::MissingSpecialization),
        }
    }

    /// Decide the handler for `operation` from every permission the caller holds.
    ///
    /// The first held permission, in catalog order, whose slot is overridden
    /// wins. A caller holding none of the catalog's permissions falls back
    /// with [`FallbackReason::PermissionNotHeld`].
    pub fn resolve(&self, operation: &str, caller: &dyn Caller) -> Resolution<'_, V> {
        if !self.registry.contains(operation) {
            return Resolution::NotApplicable(FallbackReason::Unregistered);
        }

        let candidates = self.overridden.get(operation).map(Vec::as_slice).unwrap_or(&[]);
        for &position in candidates {
            let slot = &self.slots[position];
            if caller.has_permission(&slot.permission)
                && let Some(handler) = &slot.handler
            {
                return Resolution::Specialized {
                    name: slot.name.clone(),
                    handler,
                };
            }
        }

        let holds_any = self.permissions.iter().any(|p| caller.has_permission(p));
        if holds_any {
            Resolution::NotApplicable(FallbackReason::MissingSpecialization)
        } else {
            Resolution::NotApplicable(FallbackReason::PermissionNotHeld)
        }
    }

    /// Dispatch checking one named permission
    pub fn dispatch_for(
        &self,
        view: &V,
        operation: &str,
        permission: &str,
        request: &Request<'_>,
    ) -> Result<Value> {
        let resolution = self.resolve_for(operation, permission, request.caller);
        self.audit(view, operation, Some(permission), request, &resolution);
        dispatch_resolved(
            view,
            operation,
            request,
            resolution,
            self.fallback.as_ref(),
            &self.middleware,
        )
    }

    fn audit(
        &self,
        view: &V,
        operation: &str,
        permission: Option<&str>,
        request: &Request<'_>,
        resolution: &Resolution<'_, V>,
    ) {
        if self.audit_enabled {
            info!(
                view = %view.name(),
                operation = %operation,
                permission = ?permission,
                caller = %request.caller.id(),
                resolution = ?resolution,
                "Permission dispatch"
            );
        } else {
            debug!(
                view = %view.name(),
                operation = %operation,
                permission = ?permission,
                caller = %request.caller.id(),
                resolution = ?resolution,
                "Permission dispatch"
            );
        }
    }
}

impl<V: ViewSet + Specialized> Dispatch<V> for PermissionDispatcher<V> {
    fn dispatch(&self, view: &V, operation: &str, request: &Request<'_>) -> Result<Value> {
        let resolution = self.resolve(operation, request.caller);
        self.audit(view, operation, None, request, &resolution);
        dispatch_resolved(
            view,
            operation,
            request,
            resolution,
            self.fallback.as_ref(),
            &self.middleware,
        )
    }
}
