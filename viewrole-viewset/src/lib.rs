//! # viewrole View Sets
//!
//! The handler side of viewrole: the [`ViewSet`] trait supplying base
//! operation implementations, the [`Specialized`] trait listing
//! role/permission-qualified handlers, the [`Dispatch`] seam dispatchers
//! plug into, and middleware observing dispatch decisions.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::{Value, json};
//! use viewrole_viewset::prelude::*;
//!
//! struct Articles;
//!
//! impl ViewSet for Articles {
//!     fn call_default(&self, operation: &str, _request: &Request<'_>) -> Result<Value> {
//!         match operation {
//!             "get_queryset" => Ok(json!(["published"])),
//!             other => Err(Error::method_not_found(other)),
//!         }
//!     }
//! }
//!
//! impl Specialized for Articles {}
//!
//! let caller = User::new("alice");
//! let result = BaseDispatch.dispatch(&Articles, "get_queryset", &Request::new(&caller));
//! assert_eq!(result.unwrap(), json!(["published"]));
//! ```

pub mod dispatch;
pub mod handlers;
pub mod middleware;
pub mod registry;

pub use dispatch::*;
pub use handlers::*;
pub use registry::*;

/// Common imports for view-set development
pub mod prelude {
    pub use crate::dispatch::*;
    pub use crate::handlers::*;
    pub use crate::middleware::{
        DispatchMiddleware, LoggingMiddleware, MetricsMiddleware, MetricsSnapshot,
        MiddlewareStack,
    };
    pub use crate::registry::*;
    pub use viewrole_core::prelude::*;

    pub use serde_json::{Value, json};
}
