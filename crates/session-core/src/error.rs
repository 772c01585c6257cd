//! Error types for the session registry.
//!
//! Cache-layer failures are mostly swallowed by the registry and only surface
//! through [`SessionError::CacheUnavailable`] on the explicit lookup path.
//! Write-path failures are always returned to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    // Write path errors
    #[error("Runtime not bound for session {session_id}")]
    RuntimeNotBound { session_id: String },

    #[error("Session {session_id} is a detached snapshot and cannot be bound")]
    DetachedSession { session_id: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    // Shared cache errors
    #[error("Shared cache unavailable: {message}")]
    CacheUnavailable { message: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(err: rusqlite::Error) -> Self {
        SessionError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl SessionError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        SessionError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32000: Shared cache unavailable
    /// - -32001: Session not found
    /// - -32002: Runtime not bound / detached session
    /// - -32005: Validation error
    /// - -32601: Method not found
    /// - -32602: Invalid params
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            SessionError::CacheUnavailable { .. } => -32000,

            SessionError::SessionNotFound { .. } => -32001,

            SessionError::RuntimeNotBound { .. } | SessionError::DetachedSession { .. } => -32002,

            SessionError::Validation { .. } => -32005,

            SessionError::MethodNotFound { .. } => -32601,

            SessionError::InvalidParams { .. } => -32602,

            _ => -32603,
        }
    }

    /// Check if this error is transport-class and could succeed if repeated.
    ///
    /// Nothing in this crate retries; the flag is for callers layering a policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::CacheUnavailable { .. } | SessionError::Database { .. }
        )
    }
}
