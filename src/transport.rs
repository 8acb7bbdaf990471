//! Transport layer for the MCP server.
//!
//! Two interchangeable transports deliver framed JSON-RPC messages to the
//! router:
//! - stdio: newline-delimited JSON on stdin/stdout (single-threaded loop)
//! - http: POST to a single `/mcp` endpoint (concurrent handlers)
//!
//! Logs must go to stderr in stdio mode; stdout carries only JSON-RPC.

pub mod http;
pub mod stdio;

use crate::error::ServerError;

/// Which transport to serve on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportType {
    #[default]
    Stdio,
    Http,
}

/// Error returned when parsing a transport type fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTransportTypeError(String);

impl std::fmt::Display for ParseTransportTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid transport type: '{}'", self.0)
    }
}

impl std::error::Error for ParseTransportTypeError {}

impl std::str::FromStr for TransportType {
    type Err = ParseTransportTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdio" | "standard" | "io" => Ok(TransportType::Stdio),
            "http" | "web" => Ok(TransportType::Http),
            _ => Err(ParseTransportTypeError(s.to_string())),
        }
    }
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportType::Stdio => write!(f, "stdio"),
            TransportType::Http => write!(f, "http"),
        }
    }
}

/// Startup failures that the operator CLI maps to exit codes.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The configured port is already taken (exit code 2).
    #[error("Address already in use: {addr}")]
    AddrInUse { addr: String },

    /// Any other bind or serve failure.
    #[error(transparent)]
    Other(#[from] ServerError),
}
