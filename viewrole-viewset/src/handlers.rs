//! Handler traits for view sets

use crate::registry::Specializations;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use viewrole_core::prelude::*;

/// One operation invocation: who is calling, with what parameters.
#[derive(Clone)]
pub struct Request<'a> {
    pub caller: &'a dyn Caller,
    pub params: Value,
}

impl<'a> Request<'a> {
    pub fn new(caller: &'a dyn Caller) -> Self {
        Self {
            caller,
            params: Value::Null,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Deserialize a single named parameter
    pub fn param<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .params
            .get(name)
            .ok_or_else(|| Error::invalid_params(format!("Missing parameter '{}'", name)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::invalid_params(format!("Invalid parameter '{}': {}", name, e)))
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("caller", &self.caller.id())
            .field("params", &self.params)
            .finish()
    }
}

/// A specialized (or default) handler bound to a view-set type.
pub type Handler<V> = Arc<dyn Fn(&V, &Request<'_>) -> Result<Value> + Send + Sync>;

/// Base view-set behavior: the non-specialized implementation of every
/// operation.
pub trait ViewSet: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Run the base implementation of `operation`.
    ///
    /// View sets return [`Error::MethodNotFound`] for operations they do not
    /// implement.
    fn call_default(&self, operation: &str, request: &Request<'_>) -> Result<Value>;
}

/// Role- and permission-qualified handlers a view-set type defines.
///
/// Handler names follow `<operation>_for_<role or permission>`. The
/// `#[viewset]` attribute from `viewrole-macros` implements this trait from
/// an `impl` block; types without specializations can rely on the empty
/// default.
pub trait Specialized: Sized + 'static {
    fn specializations() -> Specializations<Self> {
        Specializations::new()
    }
}

type FnHandler = Box<dyn Fn(&Request<'_>) -> Result<Value> + Send + Sync>;

/// Closure-backed view set
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use viewrole_core::prelude::*;
/// use viewrole_viewset::{FnViewSet, Request, ViewSet};
///
/// let articles = FnViewSet::new("articles")
///     .with_default("get_queryset", |_request| Ok(json!(["first", "second"])));
///
/// let caller = User::new("alice");
/// let result = articles.call_default("get_queryset", &Request::new(&caller)).unwrap();
/// assert_eq!(result, json!(["first", "second"]));
/// ```
pub struct FnViewSet {
    name: String,
    defaults: HashMap<String, FnHandler>,
}

impl FnViewSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defaults: HashMap::new(),
        }
    }

    pub fn with_default<F>(mut self, operation: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Request<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.defaults.insert(operation.into(), Box::new(handler));
        self
    }

    pub fn operations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.defaults.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ViewSet for FnViewSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn call_default(&self, operation: &str, request: &Request<'_>) -> Result<Value> {
        match self.defaults.get(operation) {
            Some(handler) => handler(request),
            None => Err(Error::method_not_found(operation)),
        }
    }
}

impl Specialized for FnViewSet {}
