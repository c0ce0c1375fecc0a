//! The outcome of resolving one call, and the single routine consuming it.

use std::fmt;
use viewrole_core::prelude::*;
use viewrole_viewset::middleware::MiddlewareStack;
use viewrole_viewset::{Dispatch, DispatchPath, FallbackReason, Handler, Request, ViewSet};

/// Which handler a call resolves to.
pub enum Resolution<'a, V> {
    /// A qualified handler applies
    Specialized { name: String, handler: &'a Handler<V> },
    /// The caller holds several roles and none may be preferred
    Ambiguous { candidates: Vec<String> },
    /// Nothing specializes this call
    NotApplicable(FallbackReason),
}

impl<V> Resolution<'_, V> {
    pub fn path(&self) -> DispatchPath {
        match self {
            Resolution::Specialized { name, .. } => DispatchPath::Specialized(name.clone()),
            Resolution::Ambiguous { .. } => DispatchPath::Fallback(FallbackReason::AmbiguousRole),
            Resolution::NotApplicable(reason) => DispatchPath::Fallback(*reason),
        }
    }

    pub fn is_specialized(&self) -> bool {
        matches!(self, Resolution::Specialized { .. })
    }

    /// Name of the specialized handler, if any
    pub fn handler_name(&self) -> Option<&str> {
        match self {
            Resolution::Specialized { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl<V> fmt::Debug for Resolution<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Specialized { name, .. } => {
                f.debug_struct("Specialized").field("name", name).finish()
            }
            Resolution::Ambiguous { candidates } => f
                .debug_struct("Ambiguous")
                .field("candidates", candidates)
                .finish(),
            Resolution::NotApplicable(reason) => {
                f.debug_tuple("NotApplicable").field(reason).finish()
            }
        }
    }
}

/// Run the handler `resolution` selects.
///
/// A specialized handler replaces the default outright; anything else is
/// handed to `fallback`. Handler errors come back unchanged.
pub fn dispatch_resolved<V: ViewSet>(
    view: &V,
    operation: &str,
    request: &Request<'_>,
    resolution: Resolution<'_, V>,
    fallback: &dyn Dispatch<V>,
    middleware: &MiddlewareStack,
) -> Result<serde_json::Value> {
    let path = resolution.path();
    middleware.run(view.name(), operation, request, &path, || match resolution {
        Resolution::Specialized { handler, .. } => handler(view, request),
        Resolution::Ambiguous { .. } | Resolution::NotApplicable(_) => {
            fallback.dispatch(view, operation, request)
        }
    })
}
