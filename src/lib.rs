//! # dbmcp
//!
//! A Model Context Protocol (MCP) server that exposes a relational database
//! to MCP clients (typically AI assistants) as tools and resources.
//!
//! This crate provides:
//! - **Tools**: `run_sql` for query execution and `describe_table` for schema lookup
//! - **Resources**: A `database://` catalog (info, data dictionary, tables, schemas)
//! - **Transports**: newline-delimited JSON-RPC on stdio, and HTTP POST to `/mcp`
//!
//! ## Architecture
//!
//! The transport layers decode framed JSON-RPC messages and hand them to the
//! protocol router, which enforces the MCP lifecycle state machine and
//! dispatches to the database service. The service owns the connection pool;
//! the router owns the service. Query results and resources are passed by
//! value back out through the router to the transport.

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod format;
pub mod messages;
pub mod protocol;
pub mod security;
pub mod transport;

pub use config::{DatabaseType, ServerConfig};
pub use database::DatabaseService;
pub use error::ServerError;
pub use protocol::McpRouter;
