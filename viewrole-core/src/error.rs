//! Error types for viewrole.
//!
//! Dispatch resolution never produces an error: ambiguous roles, missing
//! permissions and missing specializations all route to the fallback
//! handler. The types here describe what handlers, settings and identity
//! stores can fail with.
//!
//! # Examples
//!
//! ```rust
//! use viewrole_core::error::{Error, Result};
//!
//! fn example_handler() -> Result<String> {
//!     Err(Error::not_found("article 42"))
//! }
//!
//! assert!(example_handler().is_err());
//! ```

use thiserror::Error;

/// Result type alias for viewrole operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for viewrole.
///
/// Handler-level failures (raised by a specialized or a fallback handler)
/// travel through dispatch unchanged, so this enum is also what the host
/// framework sees when a handler fails.
///
/// # HTTP Status Mapping
///
/// - `InvalidParams`, `Validation`, `Serialization` → 400
/// - `PermissionDenied` → 403
/// - `NotFound` → 404
/// - `MethodNotFound` → 405
/// - everything else → 500
#[derive(Debug, Error)]
pub enum Error {
    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The view set has no implementation for the requested operation.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// The provided parameters are invalid or missing required fields.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// The requested object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A handler refused the operation for this caller.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Invalid settings or catalogs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The identity store could not answer a query.
    #[error("Identity store error: {0}")]
    Store(String),

    /// Validation error (malformed names, constraint violation, etc.).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for other error types.
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a new validation error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use viewrole_core::error::Error;
    ///
    /// let error = Error::validation("operation name must not be empty");
    /// assert_eq!(error.status_code(), 400);
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new identity store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new method not found error.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound(method.into())
    }

    /// Create a new invalid params error.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new permission denied error.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Get the HTTP status code a host framework should answer with.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use viewrole_core::error::Error;
    ///
    /// assert_eq!(Error::not_found("article").status_code(), 404);
    /// assert_eq!(Error::internal("boom").status_code(), 500);
    /// ```
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidParams(_) | Self::Validation(_) | Self::Serialization(_) => 400,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::MethodNotFound(_) => 405,
            _ => 500,
        }
    }

    /// Check if this is a client-side error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use viewrole_core::error::Error;
    ///
    /// assert!(Error::invalid_params("missing title").is_client_error());
    /// assert!(!Error::store("connection reset").is_client_error());
    /// ```
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
