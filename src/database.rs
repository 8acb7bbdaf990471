//! Database access layer.
//!
//! The service owns the connection pool and is the only component that
//! touches it; the protocol router is the only component that calls the
//! service. Metadata introspection is vendor-specific and lives in
//! [`metadata`]; generic cell decoding lives in [`convert`].

pub mod convert;
pub mod metadata;
pub mod pool;
pub mod service;

use crate::error::ServerError;

pub use pool::{ConnectionPool, PooledConnection};
pub use service::{DatabaseResource, DatabaseService, ParamValue, QueryResult};

/// The sqlx backend actually carrying the connection.
///
/// Selected by the config `driver` field, independent of the coarse
/// [`crate::config::DatabaseType`] tag derived from the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    MySql,
    Sqlite,
}

impl Backend {
    /// Parse a driver selector string.
    pub fn from_driver(driver: &str) -> Result<Self, ServerError> {
        match driver.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "mysql" | "mariadb" => Ok(Backend::MySql),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(ServerError::config(format!(
                "Unsupported driver: '{other}' (expected postgres, mysql, or sqlite)"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::MySql => "mysql",
            Backend::Sqlite => "sqlite",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_driver() {
        assert_eq!(Backend::from_driver("postgres").unwrap(), Backend::Postgres);
        assert_eq!(Backend::from_driver("PostgreSQL").unwrap(), Backend::Postgres);
        assert_eq!(Backend::from_driver("mysql").unwrap(), Backend::MySql);
        assert_eq!(Backend::from_driver("mariadb").unwrap(), Backend::MySql);
        assert_eq!(Backend::from_driver("sqlite").unwrap(), Backend::Sqlite);
        assert!(Backend::from_driver("oracle").is_err());
        assert!(Backend::from_driver("").is_err());
    }
}
