//! Named handler tables

use crate::handlers::{Handler, Request};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use viewrole_core::Result;

/// Specialized handlers keyed by their full name (`<operation>_for_<x>`).
pub struct Specializations<V> {
    handlers: HashMap<String, Handler<V>>,
}

impl<V> Specializations<V> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Add a handler
    pub fn with<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&V, &Request<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(name, handler);
        self
    }

    /// Add a handler, replacing any handler with the same name
    pub fn insert<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&V, &Request<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Merge `other` in; its handlers win on name clashes
    pub fn extend(&mut self, other: Specializations<V>) {
        self.handlers.extend(other.handlers);
    }

    pub fn get(&self, name: &str) -> Option<&Handler<V>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Handler names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<V> Clone for Specializations<V> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<V> Default for Specializations<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Specializations<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specializations")
            .field("handlers", &self.names())
            .finish()
    }
}

/// Macro for building a handler table from methods of a view-set type
///
/// ```rust
/// use serde_json::{Value, json};
/// use viewrole_core::Result;
/// use viewrole_viewset::{Request, Specializations, specializations};
///
/// struct Articles;
///
/// impl Articles {
///     fn get_queryset_for_admin(&self, _request: &Request<'_>) -> Result<Value> {
///         Ok(json!("everything"))
///     }
/// }
///
/// let table: Specializations<Articles> = specializations!(Articles { get_queryset_for_admin });
/// assert!(table.contains("get_queryset_for_admin"));
/// ```
#[macro_export]
macro_rules! specializations {
    ($view:ty { $( $method:ident ),* $(,)? }) => {
        $crate::registry::Specializations::<$view>::new()
            $( .with(stringify!($method), <$view>::$method) )*
    };
}
