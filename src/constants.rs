//! Centralized constants for the dbmcp server.
//!
//! This module contains all magic numbers and default values used throughout
//! the codebase, making them easy to find, understand, and modify.

use std::time::Duration;

// =============================================================================
// Protocol Constants
// =============================================================================

/// MCP protocol version advertised by the server and required of clients.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Server name reported in `initialize` and `/health`.
pub const SERVER_NAME: &str = "dbmcp";

// =============================================================================
// Timeout Constants
// =============================================================================

/// Default connection acquisition timeout in milliseconds.
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 30_000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout in milliseconds.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 600_000;

/// Default maximum connection lifetime in milliseconds.
pub const DEFAULT_MAX_LIFETIME_MS: u64 = 1_800_000;

/// Default leak detection threshold in milliseconds.
pub const DEFAULT_LEAK_DETECTION_THRESHOLD_MS: u64 = 60_000;

/// Grace period for HTTP server shutdown.
pub const HTTP_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// =============================================================================
// Connection Pool Constants
// =============================================================================

/// Default maximum connections in the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

// =============================================================================
// Result Size Constants
// =============================================================================

/// Default row cap applied to `run_sql` when the client omits `maxRows`.
pub const DEFAULT_MAX_ROWS: u64 = 1000;

/// Default upper bound a client may request for `maxRows`.
pub const DEFAULT_MAX_ROWS_LIMIT: u64 = 10_000;

/// Default maximum accepted SQL text length in bytes.
pub const DEFAULT_MAX_SQL_LENGTH: usize = 100_000;

/// Maximum accepted length for a table name argument.
pub const MAX_TABLE_NAME_LENGTH: usize = 128;

/// Maximum accepted length for a schema name argument.
pub const MAX_SCHEMA_NAME_LENGTH: usize = 128;

// =============================================================================
// Sanitizer Constants
// =============================================================================

/// Values longer than this are flagged as long content.
pub const VALUE_LENGTH_THRESHOLD: usize = 500;

/// Truncation length applied to overlong values.
pub const VALUE_TRUNCATE_LENGTH: usize = 200;

/// Truncation length applied to flagged values.
pub const FLAGGED_TRUNCATE_LENGTH: usize = 100;

/// Identifiers longer than this are flagged as long.
pub const IDENTIFIER_LENGTH_THRESHOLD: usize = 100;

/// Truncation length applied to overlong identifiers.
pub const IDENTIFIER_TRUNCATE_LENGTH: usize = 50;

// =============================================================================
// HTTP Constants
// =============================================================================

/// Default HTTP bind host.
pub const DEFAULT_HTTP_HOST: &str = "localhost";

/// Default HTTP bind port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

// =============================================================================
// Logging Constants
// =============================================================================

/// Default truncation length for query logging.
pub const LOG_QUERY_TRUNCATE_LENGTH: usize = 200;
