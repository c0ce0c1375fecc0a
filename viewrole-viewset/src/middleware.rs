//! Middleware observing dispatch decisions

use crate::dispatch::DispatchPath;
use crate::handlers::Request;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use viewrole_core::prelude::*;

/// Hooks run around the handler a dispatcher selected.
///
/// Hooks observe only; they cannot change the chosen path or the result.
pub trait DispatchMiddleware: Send + Sync {
    /// Called once the path is decided, before the handler runs
    fn before_dispatch(
        &self,
        view: &str,
        operation: &str,
        request: &Request<'_>,
        path: &DispatchPath,
    );

    /// Called after the handler returned successfully
    fn after_dispatch(
        &self,
        view: &str,
        operation: &str,
        path: &DispatchPath,
        result: &Value,
        elapsed: Duration,
    );

    /// Called when the handler failed
    fn on_error(&self, view: &str, operation: &str, path: &DispatchPath, error: &Error);
}

/// Ordered set of middleware
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    middleware: Vec<Arc<dyn DispatchMiddleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn DispatchMiddleware>) {
        self.middleware.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run `handler` wrapped by every middleware's hooks
    pub fn run<F>(
        &self,
        view: &str,
        operation: &str,
        request: &Request<'_>,
        path: &DispatchPath,
        handler: F,
    ) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        if self.middleware.is_empty() {
            return handler();
        }

        for middleware in &self.middleware {
            middleware.before_dispatch(view, operation, request, path);
        }

        let started = Instant::now();
        let result = handler();
        let elapsed = started.elapsed();

        match &result {
            Ok(value) => {
                for middleware in &self.middleware {
                    middleware.after_dispatch(view, operation, path, value, elapsed);
                }
            }
            Err(e) => {
                for middleware in &self.middleware {
                    middleware.on_error(view, operation, path, e);
                }
            }
        }

        result
    }
}

/// Logging middleware
pub struct LoggingMiddleware {
    pub log_requests: bool,
    pub log_responses: bool,
    pub log_timing: bool,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self {
            log_requests: true,
            log_responses: false,
            log_timing: true,
        }
    }

    pub fn with_requests(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    pub fn with_responses(mut self, enabled: bool) -> Self {
        self.log_responses = enabled;
        self
    }

    pub fn with_timing(mut self, enabled: bool) -> Self {
        self.log_timing = enabled;
        self
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchMiddleware for LoggingMiddleware {
    fn before_dispatch(
        &self,
        view: &str,
        operation: &str,
        request: &Request<'_>,
        path: &DispatchPath,
    ) {
        if self.log_requests {
            info!(
                view = %view,
                operation = %operation,
                caller = %request.caller.id(),
                path = %path,
                "Dispatching"
            );
        }
    }

    fn after_dispatch(
        &self,
        view: &str,
        operation: &str,
        path: &DispatchPath,
        result: &Value,
        elapsed: Duration,
    ) {
        if self.log_responses {
            info!(view = %view, operation = %operation, path = %path, result = %result, "Dispatch result");
        }
        if self.log_timing {
            info!(
                view = %view,
                operation = %operation,
                elapsed_us = elapsed.as_micros() as u64,
                "Dispatch timing"
            );
        }
    }

    fn on_error(&self, view: &str, operation: &str, path: &DispatchPath, e: &Error) {
        if e.is_client_error() {
            warn!(view = %view, operation = %operation, path = %path, error = %e, "Handler rejected request");
        } else {
            error!(view = %view, operation = %operation, path = %path, error = %e, "Handler failed");
        }
    }
}

/// Counts of dispatch decisions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Calls per specialized handler name
    pub specialized: HashMap<String, u64>,
    /// Fallback calls per operation
    pub fallbacks: HashMap<String, u64>,
    /// Fallback calls per reason
    pub fallback_reasons: HashMap<String, u64>,
    /// Failed calls per operation
    pub errors: HashMap<String, u64>,
}

/// Metrics collection middleware
#[derive(Default)]
pub struct MetricsMiddleware {
    counts: Mutex<MetricsSnapshot>,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record<F>(&self, update: F)
    where
        F: FnOnce(&mut MetricsSnapshot),
    {
        let mut counts = self
            .counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut counts);
    }
}

impl DispatchMiddleware for MetricsMiddleware {
    fn before_dispatch(
        &self,
        _view: &str,
        operation: &str,
        _request: &Request<'_>,
        path: &DispatchPath,
    ) {
        self.record(|counts| match path {
            DispatchPath::Specialized(name) => {
                *counts.specialized.entry(name.clone()).or_insert(0) += 1;
            }
            DispatchPath::Fallback(reason) => {
                *counts.fallbacks.entry(operation.to_string()).or_insert(0) += 1;
                *counts
                    .fallback_reasons
                    .entry(reason.as_str().to_string())
                    .or_insert(0) += 1;
            }
        });
    }

    fn after_dispatch(
        &self,
        _view: &str,
        _operation: &str,
        _path: &DispatchPath,
        _result: &Value,
        _elapsed: Duration,
    ) {
    }

    fn on_error(&self, _view: &str, operation: &str, _path: &DispatchPath, _error: &Error) {
        self.record(|counts| {
            *counts.errors.entry(operation.to_string()).or_insert(0) += 1;
        });
    }
}
