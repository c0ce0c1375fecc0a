//! Error types for viewrole RBAC
//!
//! These only arise while building dispatchers. Dispatch itself never
//! fails on its own account: resolution problems become fallbacks.

use thiserror::Error;

/// Errors that can occur while building a dispatcher
#[derive(Error, Debug)]
pub enum RbacError {
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Core(#[from] viewrole_core::Error),
}

/// Result of building a dispatcher
pub type RbacResult<T> = std::result::Result<T, RbacError>;
