//! The dispatch seam shared by every dispatcher.
//!
//! A dispatcher picks one handler per call. Whatever it cannot specialize
//! goes to its fallback, which is another [`Dispatch`] implementation;
//! [`BaseDispatch`] terminates the chain at [`ViewSet::call_default`].

use crate::handlers::{Request, ViewSet};
use serde_json::Value;
use std::fmt;
use viewrole_core::Result;

/// Route `operation` on `view` to exactly one handler.
pub trait Dispatch<V>: Send + Sync {
    fn dispatch(&self, view: &V, operation: &str, request: &Request<'_>) -> Result<Value>;
}

/// Calls the view set's base implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseDispatch;

impl<V: ViewSet> Dispatch<V> for BaseDispatch {
    fn dispatch(&self, view: &V, operation: &str, request: &Request<'_>) -> Result<Value> {
        view.call_default(operation, request)
    }
}

/// Why a call did not take a specialized handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    /// The operation is not in the registry
    Unregistered,
    /// The caller belongs to no configured role group
    NoRole,
    /// The caller belongs to several configured role groups
    AmbiguousRole,
    /// The caller lacks the permission
    PermissionNotHeld,
    /// The permission is not in the catalog
    NoPermissionSlot,
    /// No handler is defined under the qualified name
    MissingSpecialization,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Unregistered => "unregistered",
            FallbackReason::NoRole => "no_role",
            FallbackReason::AmbiguousRole => "ambiguous_role",
            FallbackReason::PermissionNotHeld => "permission_not_held",
            FallbackReason::NoPermissionSlot => "no_permission_slot",
            FallbackReason::MissingSpecialization => "missing_specialization",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The branch a dispatcher took.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DispatchPath {
    Specialized(String),
    Fallback(FallbackReason),
}

impl fmt::Display for DispatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchPath::Specialized(name) => write!(f, "specialized:{}", name),
            DispatchPath::Fallback(reason) => write!(f, "fallback:{}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::FnViewSet;
    use serde_json::json;
    use viewrole_core::identity::Anonymous;

    #[test]
    fn test_base_dispatch_calls_default() {
        let view = FnViewSet::new("notes").with_default("get_queryset", |_| Ok(json!("base")));
        let caller = Anonymous;

        let result = BaseDispatch.dispatch(&view, "get_queryset", &Request::new(&caller));
        assert_eq!(result.unwrap(), json!("base"));
    }

    #[test]
    fn test_path_display() {
        assert_eq!(
            DispatchPath::Specialized("list_for_admin".to_string()).to_string(),
            "specialized:list_for_admin"
        );
        assert_eq!(
            DispatchPath::Fallback(FallbackReason::AmbiguousRole).to_string(),
            "fallback:ambiguous_role"
        );
    }
}
