//! Role-qualified dispatch.
//!
//! For a registered operation, the caller's single role (from its group
//! memberships) selects `<operation>_for_<role>`. Callers with no role, or
//! with several roles under [`RolePolicy::Strict`], get the fallback.

use crate::builder::RoleDispatcherBuilder;
use crate::error::RbacResult;
use crate::resolution::{Resolution, dispatch_resolved};
use serde_json::Value;
use tracing::{debug, info};
use viewrole_core::prelude::*;
use viewrole_viewset::middleware::MiddlewareStack;
use viewrole_viewset::{
    Dispatch, FallbackReason, Request, Specializations, Specialized, ViewSet,
};

/// Dispatches registered operations to role-qualified handlers.
///
/// # Examples
///
/// ```rust
/// use viewrole_rbac::prelude::*;
///
/// let view = FnViewSet::new("articles")
///     .with_default("list", |_| Ok(json!("B")));
///
/// let dispatcher = RoleDispatcher::<FnViewSet>::builder()
///     .with_operations(&["list"])
///     .with_roles(&["admin", "viewer"])
///     .with_handler("list_for_admin", |_, _| Ok(json!("A")))
///     .build()
///     .unwrap();
///
/// let admin = User::new("alice").with_group("admin");
/// let both = User::new("bob").with_groups(&["admin", "viewer"]);
///
/// assert_eq!(dispatcher.dispatch(&view, "list", &Request::new(&admin)).unwrap(), json!("A"));
/// assert_eq!(dispatcher.dispatch(&view, "list", &Request::new(&both)).unwrap(), json!("B"));
/// ```
pub struct RoleDispatcher<V> {
    pub(crate) registry: OperationRegistry,
    pub(crate) roles: RoleCatalog,
    pub(crate) policy: RolePolicy,
    pub(crate) handlers: Specializations<V>,
    pub(crate) fallback: Box<dyn Dispatch<V>>,
    pub(crate) middleware: MiddlewareStack,
    pub(crate) audit_enabled: bool,
}

impl<V: ViewSet + Specialized> RoleDispatcher<V> {
    /// Create a new role dispatcher builder
    pub fn builder() -> RoleDispatcherBuilder<V> {
        RoleDispatcherBuilder::new()
    }

    /// Dispatcher over loaded catalogs with the default fallback
    pub fn from_catalogs(catalogs: &Catalogs, policy: RolePolicy) -> RbacResult<Self> {
        Self::builder()
            .with_catalogs(catalogs)
            .with_policy(policy)
            .build()
    }

    /// Decide which handler `operation` takes for `caller`.
    ///
    /// The role is recomputed on every call.
    pub fn resolve(&self, operation: &str, caller: &dyn Caller) -> Resolution<'_, V> {
        if !self.registry.contains(operation) {
            return Resolution::NotApplicable(FallbackReason::Unregistered);
        }

        match resolve_role_with_policy(caller.group_names(), &self.roles, self.policy) {
            Ok(None) => Resolution::NotApplicable(FallbackReason::NoRole),
            Err(ambiguous) => Resolution::Ambiguous {
                candidates: ambiguous.roles.into_iter().map(String::from).collect(),
            },
            Ok(Some(role)) => {
                let name = specialized_name(operation, role.as_str());
                match self.handlers.get(&name) {
                    Some(handler) => Resolution::Specialized { name, handler },
                    None => Resolution::NotApplicable(FallbackReason::MissingSpecialization),
                }
            }
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn roles(&self) -> &RoleCatalog {
        &self.roles
    }

    pub fn policy(&self) -> RolePolicy {
        self.policy
    }

    pub fn handlers(&self) -> &Specializations<V> {
        &self.handlers
    }
}

impl<V: ViewSet + Specialized> Dispatch<V> for RoleDispatcher<V> {
    fn dispatch(&self, view: &V, operation: &str, request: &Request<'_>) -> Result<Value> {
        let resolution = self.resolve(operation, request.caller);

        if self.audit_enabled {
            info!(
                view = %view.name(),
                operation = %operation,
                caller = %request.caller.id(),
                resolution = ?resolution,
                "Role dispatch"
            );
        } else {
            debug!(
                view = %view.name(),
                operation = %operation,
                caller = %request.caller.id(),
                resolution = ?resolution,
                "Role dispatch"
            );
        }

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
