//! Builders for the role and permission dispatchers

use crate::error::{RbacError, RbacResult};
use crate::permission::PermissionDispatcher;
use crate::role::RoleDispatcher;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use viewrole_core::prelude::*;
use viewrole_viewset::middleware::{DispatchMiddleware, MiddlewareStack};
use viewrole_viewset::{BaseDispatch, Dispatch, Request, Specializations, Specialized, ViewSet};

/// Settings shared by both builders
struct Wiring<V> {
    operations: Option<Vec<String>>,
    handlers: Specializations<V>,
    fallback: Option<Box<dyn Dispatch<V>>>,
    middleware: MiddlewareStack,
    audit_enabled: bool,
}

impl<V: ViewSet + Specialized> Wiring<V> {
    fn new() -> Self {
        Self {
            operations: None,
            handlers: Specializations::new(),
            fallback: None,
            middleware: MiddlewareStack::new(),
            audit_enabled: false,
        }
    }

    fn registry(&self) -> RbacResult<OperationRegistry> {
        let registry = match &self.operations {
            Some(names) => OperationRegistry::new(names)
                .map_err(|e| RbacError::InvalidOperation(e.to_string()))?,
            None => OperationRegistry::default(),
        };
        if registry.is_empty() {
            return Err(RbacError::Configuration(
                "operation registry is empty".to_string(),
            ));
        }
        Ok(registry)
    }

    /// The type's own specializations, overridden by handlers added on the builder
    fn handlers(&mut self) -> Specializations<V> {
        let mut handlers = V::specializations();
        handlers.extend(std::mem::take(&mut self.handlers));
        handlers
    }

    fn fallback(&mut self) -> Box<dyn Dispatch<V>> {
        self.fallback.take().unwrap_or_else(|| Box::new(BaseDispatch))
    }
}

fn report_unreachable<V>(handlers: &Specializations<V>, reachable: &HashSet<String>) {
    for name in handlers.names() {
        if !reachable.contains(name) {
            debug!(handler = %name, "Handler matches no registered operation and qualifier");
        }
    }
}

/// Builder for [`RoleDispatcher`]
pub struct RoleDispatcherBuilder<V> {
    wiring: Wiring<V>,
    roles: Option<RoleCatalog>,
    policy: RolePolicy,
}

impl<V: ViewSet + Specialized> RoleDispatcherBuilder<V> {
    pub fn new() -> Self {
        Self {
            wiring: Wiring::new(),
            roles: None,
            policy: RolePolicy::default(),
        }
    }

    /// Set the operations eligible for specialization
    pub fn with_operations(mut self, operations: &[&str]) -> Self {
        self.wiring.operations = Some(operations.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_registry(mut self, registry: &OperationRegistry) -> Self {
        self.wiring.operations = Some(registry.iter().map(|o| o.to_string()).collect());
        self
    }

    /// Set the recognized role groups, highest priority first
    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = Some(RoleCatalog::new(roles));
        self
    }

    pub fn with_role_catalog(mut self, roles: RoleCatalog) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Take the registry and role catalog from loaded catalogs
    pub fn with_catalogs(self, catalogs: &Catalogs) -> Self {
        self.with_registry(&catalogs.registry)
            .with_role_catalog(catalogs.roles.clone())
    }

    pub fn with_policy(mut self, policy: RolePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply whatever `settings` sets
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        if let Some(operations) = &settings.viewset_method_registry {
            self.wiring.operations = Some(operations.clone());
        }
        if let Some(roles) = &settings.role_groups {
            self.roles = Some(RoleCatalog::new(roles));
        }
        if let Some(policy) = settings.role_policy {
            self.policy = policy;
        }
        self
    }

    /// Add a specialized handler, overriding one the type defines
    pub fn with_handler<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&V, &Request<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.wiring.handlers.insert(name, handler);
        self
    }

    pub fn with_handlers(mut self, handlers: Specializations<V>) -> Self {
        self.wiring.handlers.extend(handlers);
        self
    }

    /// Dispatcher receiving every call this one does not specialize
    pub fn with_fallback<D>(mut self, fallback: D) -> Self
    where
        D: Dispatch<V> + 'static,
    {
        self.wiring.fallback = Some(Box::new(fallback));
        self
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn DispatchMiddleware>) -> Self {
        self.wiring.middleware.push(middleware);
        self
    }

    /// Log every dispatch decision at info level
    pub fn with_audit_logging(mut self, enabled: bool) -> Self {
        self.wiring.audit_enabled = enabled;
        self
    }

    /// Build the role dispatcher
    pub fn build(mut self) -> RbacResult<RoleDispatcher<V>> {
        let registry = self.wiring.registry()?;
        let roles = self.roles.take().unwrap_or_default();
        if roles.is_empty() {
            warn!("No role groups configured, every call will use the fallback");
        }

        let handlers = self.wiring.handlers();
        let reachable: HashSet<String> = registry
            .iter()
            .flat_map(|op| roles.iter().map(move |role| op.qualified(role.as_str())))
            .collect();
        report_unreachable(&handlers, &reachable);

        debug!(
            operations = registry.len(),
            roles = roles.len(),
            handlers = handlers.len(),
            policy = %self.policy,
            "Built role dispatcher"
        );

        Ok(RoleDispatcher {
            registry,
            roles,
            policy: self.policy,
            handlers,
            fallback: self.wiring.fallback(),
            middleware: self.wiring.middleware,
            audit_enabled: self.wiring.audit_enabled,
        })
    }
}

impl<V: ViewSet + Specialized> Default for RoleDispatcherBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`PermissionDispatcher`]
pub struct PermissionDispatcherBuilder<V> {
    wiring: Wiring<V>,
    permissions: Option<PermissionCatalog>,
}

impl<V: ViewSet + Specialized> PermissionDispatcherBuilder<V> {
    pub fn new() -> Self {
        Self {
            wiring: Wiring::new(),
            permissions: None,
        }
    }

    /// Set the operations eligible for specialization
    pub fn with_operations(mut self, operations: &[&str]) -> Self {
        self.wiring.operations = Some(operations.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_registry(mut self, registry: &OperationRegistry) -> Self {
        self.wiring.operations = Some(registry.iter().map(|o| o.to_string()).collect());
        self
    }

    /// Set the known permissions; catalog order decides which held
    /// permission wins
    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(PermissionCatalog::new(permissions));
        self
    }

    pub fn with_permission_catalog(mut self, permissions: PermissionCatalog) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Take the registry and permission catalog from loaded catalogs
    pub fn with_catalogs(self, catalogs: &Catalogs) -> Self {
        self.with_registry(&catalogs.registry)
            .with_permission_catalog(catalogs.permissions.clone())
    }

    /// Apply the operation registry from `settings`, if set
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        if let Some(operations) = &settings.viewset_method_registry {
            self.wiring.operations = Some(operations.clone());
        }
        self
    }

    /// Add a specialized handler, overriding one the type defines
    pub fn with_handler<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&V, &Request<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.wiring.handlers.insert(name, handler);
        self
    }

    pub fn with_handlers(mut self, handlers: Specializations<V>) -> Self {
        self.wiring.handlers.extend(handlers);
        self
    }

    /// Dispatcher receiving every call this one does not specialize
    pub fn with_fallback<D>(mut self, fallback: D) -> Self
    where
        D: Dispatch<V> + 'static,
    {
        self.wiring.fallback = Some(Box::new(fallback));
        self
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn DispatchMiddleware>) -> Self {
        self.wiring.middleware.push(middleware);
        self
    }

    /// Log every dispatch decision at info level
    pub fn with_audit_logging(mut self, enabled: bool) -> Self {
        self.wiring.audit_enabled = enabled;
        self
    }

    /// Build the permission dispatcher and its slot table
    pub fn build(mut self) -> RbacResult<PermissionDispatcher<V>> {
        let registry = self.wiring.registry()?;
        let permissions = self.permissions.take().unwrap_or_default();
        if permissions.is_empty() {
            warn!("No permissions known, every call will use the fallback");
        }

        let handlers = self.wiring.handlers();
        let (slots, index, overridden) =
            PermissionDispatcher::slot_table(&registry, &permissions, &handlers);

        let reachable: HashSet<String> = slots.iter().map(|s| s.name().to_string()).collect();
        report_unreachable(&handlers, &reachable);

        debug!(
            operations = registry.len(),
            permissions = permissions.len(),
            slots = slots.len(),
            overridden = overridden.values().map(Vec::len).sum::<usize>(),
            "Built permission dispatcher"
        );

        Ok(PermissionDispatcher {
            registry,
            permissions,
            slots,
            index,
            overridden,
            fallback: self.wiring.fallback(),
            middleware: self.wiring.middleware,
            audit_enabled: self.wiring.audit_enabled,
        })
    }
}

impl<V: ViewSet + Specialized> Default for PermissionDispatcherBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}
