//! Error types for the dbmcp server.
//!
//! This module defines the semantic error enum used at every component
//! boundary, plus the single place where errors map to JSON-RPC codes.

use thiserror::Error;

/// JSON-RPC error code for malformed or lifecycle-violating requests.
pub const INVALID_REQUEST: i32 = -32600;

/// JSON-RPC error code for an unknown method.
pub const METHOD_NOT_FOUND: i32 = -32601;

/// JSON-RPC error code for argument validation failures.
pub const INVALID_PARAMS: i32 = -32602;

/// JSON-RPC error code for unexpected internal failures.
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC error code reserved for database failures.
///
/// SQL failures are reported inside the tool-result envelope with
/// `isError: true` instead, so this code is rarely emitted.
pub const DATABASE_ERROR: i32 = -32000;

/// Domain-specific errors for the dbmcp server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error (fatal at construction)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection pool exhausted (acquisition timed out)
    #[error("Connection pool exhausted: no connection available within {timeout_ms} ms")]
    PoolExhausted { timeout_ms: u64 },

    /// Lifecycle state machine violation
    #[error("Invalid request: {0}")]
    Lifecycle(String),

    /// Unknown JSON-RPC method
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Argument validation failure (null, empty, over-length, out-of-range)
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Resource lookup failed
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// SQL rejected by the select-only validator
    #[error("Query validation failed: {0}")]
    ValidationFailed(String),

    /// Query execution error from the driver
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// Query timeout
    #[error("Query timeout: operation exceeded {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a lifecycle violation error.
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Create a method-not-found error.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound(method.into())
    }

    /// Create an invalid-params error.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// Create a resource-not-found error.
    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::ResourceNotFound(uri.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Create a query execution error.
    pub fn query_error(msg: impl Into<String>) -> Self {
        Self::QueryExecution(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout {
            timeout_seconds: seconds,
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map this error to its JSON-RPC error code.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::Lifecycle(_) => INVALID_REQUEST,
            Self::MethodNotFound(_) => METHOD_NOT_FOUND,
            Self::InvalidParams(_) | Self::ResourceNotFound(_) => INVALID_PARAMS,
            _ => INTERNAL_ERROR,
        }
    }

    /// Whether this error belongs inside a tool-result envelope rather than
    /// a JSON-RPC error response.
    pub fn is_tool_level(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed(_)
                | Self::QueryExecution(_)
                | Self::Timeout { .. }
                | Self::PoolExhausted { .. }
                | Self::Connection(_)
        )
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut => ServerError::PoolExhausted { timeout_ms: 0 },
            sqlx::Error::PoolClosed => ServerError::connection("Connection pool is closed"),
            sqlx::Error::Io(_) => ServerError::connection(format!("IO error: {e}")),
            sqlx::Error::Tls(_) => ServerError::connection(format!("TLS error: {e}")),
            sqlx::Error::Configuration(_) => ServerError::config(e.to_string()),
            sqlx::Error::Database(db) => ServerError::query_error(db.message().to_string()),
            sqlx::Error::RowNotFound => ServerError::query_error("Row not found"),
            sqlx::Error::ColumnNotFound(col) => {
                ServerError::query_error(format!("Column not found: {col}"))
            }
            _ => ServerError::query_error(e.to_string()),
        }
    }
}
