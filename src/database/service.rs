//! The database service: SQL execution and the `database://` resource
//! catalog.
//!
//! This is the only component that touches the connection pool. Every
//! operation leases exactly one connection for its duration and releases
//! it on all exit paths via the lease guard.

use crate::config::{DatabaseType, ServerConfig};
use crate::constants::LOG_QUERY_TRUNCATE_LENGTH;
use crate::database::metadata;
use crate::database::pool::ConnectionPool;
use crate::database::{convert, Backend};
use crate::error::ServerError;
use crate::messages;
use crate::security::{sanitize_identifier, sanitize_value, truncate, validate_select_only};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::AnyConnection;
use sqlx::{Column, Executor, Statement};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Result of a query execution.
///
/// For statements that produce no result set, a synthetic one-column
/// `affected_rows` result carries the update count; that is the only case
/// where a row's length may differ from `columns.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in declared order.
    pub columns: Vec<String>,

    /// Rows of decoded cells; SQL NULL is JSON null.
    pub rows: Vec<Vec<Value>>,

    /// Row count of the (possibly truncated) result.
    pub row_count: usize,

    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: u64,
}

/// An addressable read-only document in the `database://` catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseResource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    /// Prepopulated for info and data-dictionary entries; `None` for
    /// table and schema entries, whose content is produced on demand.
    pub content: Option<String>,
}

/// A coerced query parameter ready for driver binding.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Coerce a JSON value: null→nil, bool→bool, integer→int64, other
    /// numeric→float64, string→string, anything else→stringified JSON.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParamValue::Int(i)
                } else {
                    ParamValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => ParamValue::Text(s.clone()),
            other => ParamValue::Text(other.to_string()),
        }
    }
}

/// Resource URI prefixes forming the catalog taxonomy.
pub const URI_INFO: &str = "database://info";
pub const URI_DATA_DICTIONARY: &str = "database://data-dictionary";
pub const URI_TABLE_PREFIX: &str = "database://table/";
pub const URI_SCHEMA_PREFIX: &str = "database://schema/";

/// Database service owning the connection pool.
#[derive(Clone)]
pub struct DatabaseService {
    pool: ConnectionPool,
    config: Arc<ServerConfig>,
    backend: Backend,
    database_type: DatabaseType,
}

impl DatabaseService {
    /// Connect the pool and build the service.
    pub async fn connect(config: Arc<ServerConfig>) -> Result<Self, ServerError> {
        let backend = Backend::from_driver(&config.driver)?;
        let pool = ConnectionPool::connect(&config).await?;
        Ok(Self {
            pool,
            database_type: config.database_type(),
            config,
            backend,
        })
    }

    /// The coarse vendor tag derived from the connection URL.
    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    /// Probe the pool for the health endpoint: briefly acquire and
    /// release a connection.
    pub async fn probe(&self) -> Result<(), ServerError> {
        let _conn = self.pool.acquire("health_probe").await?;
        Ok(())
    }

    /// Close the pool. Idempotent.
    pub async fn shutdown(&self) {
        self.pool.close().await;
    }

    /// Execute SQL with a row cap and the configured query timeout.
    ///
    /// In select-only mode the statement passes the coarse validator
    /// before it reaches the driver. Statements without a result set
    /// produce the synthetic `affected_rows` result.
    pub async fn execute_sql(
        &self,
        sql: &str,
        max_rows: u64,
        params: &[ParamValue],
    ) -> Result<QueryResult, ServerError> {
        if self.config.select_only {
            validate_select_only(sql).map_err(|r| ServerError::validation(r.to_string()))?;
        }

        debug!(sql = %truncate(sql, LOG_QUERY_TRUNCATE_LENGTH), max_rows, "executing query");

        let start = Instant::now();
        let mut conn = self.pool.acquire("execute_sql").await?;

        let timeout = self.config.query_timeout;
        let mut result =
            tokio::time::timeout(timeout, run_statement(conn.as_mut(), sql, max_rows, params))
                .await
                .map_err(|_| ServerError::timeout(timeout.as_secs()))??;

        result.execution_time_ms = start.elapsed().as_millis() as u64;

        debug!(
            rows = result.row_count,
            elapsed_ms = result.execution_time_ms,
            "query completed"
        );

        Ok(result)
    }

    /// Enumerate the resource catalog: info and data-dictionary with
    /// prepopulated content, then one lazy entry per table/view, then one
    /// per non-empty schema.
    pub async fn list_resources(&self) -> Result<Vec<DatabaseResource>, ServerError> {
        let mut conn = self.pool.acquire("list_resources").await?;
        let conn = conn.as_mut();

        let mut resources = vec![
            DatabaseResource {
                uri: URI_INFO.to_string(),
                name: "Database Info".to_string(),
                description: "Database product, version, and feature information".to_string(),
                mime_type: "text/plain".to_string(),
                content: Some(self.render_info(conn).await),
            },
            DatabaseResource {
                uri: URI_DATA_DICTIONARY.to_string(),
                name: "Data Dictionary".to_string(),
                description: "Schema overview with vendor-specific query guidance".to_string(),
                mime_type: "text/plain".to_string(),
                content: Some(self.render_data_dictionary(conn).await),
            },
        ];

        for table in metadata::list_tables(conn, self.backend).await? {
            resources.push(DatabaseResource {
                uri: format!("{URI_TABLE_PREFIX}{}", table.name),
                name: table.name.clone(),
                description: format!(
                    "{} {}",
                    if table.entry_type == "VIEW" { "View" } else { "Table" },
                    table.name
                ),
                mime_type: "text/plain".to_string(),
                content: None,
            });
        }

        for schema in metadata::list_schemas(conn, self.backend).await {
            resources.push(DatabaseResource {
                uri: format!("{URI_SCHEMA_PREFIX}{schema}"),
                name: schema.clone(),
                description: format!("Schema {schema}"),
                mime_type: "text/plain".to_string(),
                content: None,
            });
        }

        Ok(resources)
    }

    /// Read one resource by URI. `Ok(None)` means the URI does not
    /// resolve; the router maps that to "Resource not found".
    pub async fn read_resource(&self, uri: &str) -> Result<Option<DatabaseResource>, ServerError> {
        if uri == URI_INFO {
            let mut conn = self.pool.acquire("read_resource").await?;
            let content = self.render_info(conn.as_mut()).await;
            return Ok(Some(DatabaseResource {
                uri: uri.to_string(),
                name: "Database Info".to_string(),
                description: "Database product, version, and feature information".to_string(),
                mime_type: "text/plain".to_string(),
                content: Some(content),
            }));
        }

        if uri == URI_DATA_DICTIONARY {
            let mut conn = self.pool.acquire("read_resource").await?;
            let content = self.render_data_dictionary(conn.as_mut()).await;
            return Ok(Some(DatabaseResource {
                uri: uri.to_string(),
                name: "Data Dictionary".to_string(),
                description: "Schema overview with vendor-specific query guidance".to_string(),
                mime_type: "text/plain".to_string(),
                content: Some(content),
            }));
        }

        if let Some(name) = uri.strip_prefix(URI_TABLE_PREFIX) {
            if name.is_empty() {
                return Ok(None);
            }
            return self.read_table_resource(name, None).await;
        }

        if let Some(name) = uri.strip_prefix(URI_SCHEMA_PREFIX) {
            if name.is_empty() {
                return Ok(None);
            }
            return self.read_schema_resource(name).await;
        }

        Ok(None)
    }

    /// Table resource lookup, optionally constrained to a schema. Used by
    /// both `resources/read` and the `describe_table` tool.
    pub async fn read_table_resource(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Option<DatabaseResource>, ServerError> {
        let mut conn = self.pool.acquire("read_table").await?;
        let conn = conn.as_mut();

        let tables = metadata::list_tables(conn, self.backend).await?;
        let exists = tables.iter().any(|t| {
            t.name == table && schema.map_or(true, |s| t.schema.as_deref() == Some(s))
        });
        if !exists {
            return Ok(None);
        }

        let content = self.render_table(conn, table).await?;
        Ok(Some(DatabaseResource {
            uri: format!("{URI_TABLE_PREFIX}{table}"),
            name: table.to_string(),
            description: format!("Table {table}"),
            mime_type: "text/plain".to_string(),
            content: Some(content),
        }))
    }

    async fn read_schema_resource(
        &self,
        schema: &str,
    ) -> Result<Option<DatabaseResource>, ServerError> {
        let mut conn = self.pool.acquire("read_schema").await?;
        let conn = conn.as_mut();

        let schemas = metadata::list_schemas(conn, self.backend).await;
        if !schemas.iter().any(|s| s == schema) {
            return Ok(None);
        }

        let tables = metadata::tables_in_schema(conn, self.backend, schema).await?;
        let mut content = format!("Schema: {}\n\n", sanitize_identifier(Some(schema)));
        content.push_str("Tables in this schema:\n");
        if tables.is_empty() {
            content.push_str("  (none)\n");
        }
        for table in &tables {
            content.push_str(&format!(
                "  {} ({})\n",
                sanitize_identifier(Some(&table.name)),
                table.entry_type
            ));
        }

        Ok(Some(DatabaseResource {
            uri: format!("{URI_SCHEMA_PREFIX}{schema}"),
            name: schema.to_string(),
            description: format!("Schema {schema}"),
            mime_type: "text/plain".to_string(),
            content: Some(content),
        }))
    }

    /// Render the table resource: columns, keys, and indexes, bracketed
    /// by the security header and footer. All user-supplied identifiers
    /// and default values pass through the sanitizer.
    async fn render_table(
        &self,
        conn: &mut AnyConnection,
        table: &str,
    ) -> Result<String, ServerError> {
        let columns = metadata::table_columns(conn, self.backend, table).await?;
        let primary_keys = metadata::primary_keys(conn, self.backend, table).await;
        let foreign_keys = metadata::foreign_keys(conn, self.backend, table).await;
        let indexes = metadata::indexes(conn, self.backend, table).await;

        let mut out = String::new();
        out.push_str(&messages::security_warning("metadataHeader", &[]));
        out.push_str("\n\n");
        out.push_str(&format!("Table: {}\n\n", sanitize_identifier(Some(table))));

        out.push_str("Columns:\n");
        for col in &columns {
            let mut line = format!(
                "  {} ({}",
                sanitize_identifier(Some(&col.name)),
                col.data_type
            );
            if let Some(size) = col.size {
                line.push_str(&format!("({size})"));
            }
            line.push(')');
            if !col.nullable {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = &col.default_value {
                line.push_str(&format!(" DEFAULT {}", sanitize_value(Some(default))));
            }
            if let Some(remarks) = &col.remarks {
                line.push_str(&format!(" -- [COMMENT]: {}", sanitize_value(Some(remarks))));
            }
            out.push_str(&line);
            out.push('\n');
        }

        if !primary_keys.is_empty() {
            out.push_str("\nPrimary Keys:\n");
            for pk in &primary_keys {
                out.push_str(&format!("  {}\n", sanitize_identifier(Some(pk))));
            }
        }

        if !foreign_keys.is_empty() {
            out.push_str("\nForeign Keys:\n");
            for fk in &foreign_keys {
                out.push_str(&format!(
                    "  {} -> {}.{} ({})\n",
                    sanitize_identifier(Some(&fk.column)),
                    sanitize_identifier(Some(&fk.ref_table)),
                    sanitize_identifier(Some(&fk.ref_column)),
                    sanitize_identifier(Some(&fk.fk_name)),
                ));
            }
        }

        if !indexes.is_empty() {
            out.push_str("\nIndexes:\n");
            for idx in &indexes {
                let mut line = format!(
                    "  {} ({}",
                    sanitize_identifier(Some(&idx.name)),
                    if idx.unique { "UNIQUE" } else { "NON-UNIQUE" }
                );
                if let Some(index_type) = &idx.index_type {
                    line.push_str(&format!(", Type: {index_type}"));
                }
                line.push(')');
                out.push_str(&line);
                out.push('\n');
            }
        }

        out.push('\n');
        out.push_str(&messages::security_warning("metadataFooter", &[]));
        Ok(out)
    }

    /// Render the info resource. Every vendor lookup is optional and
    /// degrades to an "Unable to retrieve" note.
    async fn render_info(&self, conn: &mut AnyConnection) -> String {
        let vendor = metadata::vendor_info(conn, self.backend).await;
        let db_type = self.database_type.name();

        let mut out = String::new();
        out.push_str("Database Information\n");
        out.push_str("====================\n\n");
        out.push_str(&format!(
            "Product: {}\n",
            vendor.product_version.as_deref().unwrap_or("Unable to retrieve")
        ));
        out.push_str(&format!("Database Type: {db_type}\n"));
        out.push_str(&format!("Driver: sqlx/{}\n", self.backend.name()));
        out.push_str(&format!("URL: {}\n", self.config.redacted_url()));
        out.push_str(&format!(
            "User: {}\n",
            if self.config.user.is_empty() {
                "(none)"
            } else {
                &self.config.user
            }
        ));
        out.push_str(&format!("Read-only mode: {}\n", self.config.select_only));
        out.push_str(&format!(
            "Character Set: {}\n",
            vendor.character_set.as_deref().unwrap_or("Unable to retrieve")
        ));
        out.push_str(&format!(
            "Collation: {}\n",
            vendor.collation.as_deref().unwrap_or("Unable to retrieve")
        ));
        out.push_str(&format!(
            "Timezone: {}\n",
            vendor.timezone.as_deref().unwrap_or("Unable to retrieve")
        ));

        out.push_str(&format!("\nSQL Dialect Guidance ({db_type}):\n"));
        out.push_str(&messages::database_help(db_type, "dialectGuidance"));
        out.push('\n');

        out.push_str("\nCapabilities:\n");
        out.push_str(&format!(
            "  schemas: {}\n",
            self.backend != Backend::Sqlite
        ));
        out.push_str("  transactions: true\n");
        out.push_str("  prepared statements: true\n");
        out.push_str(&format!("  select-only enforcement: {}\n", self.config.select_only));

        out
    }

    /// Render the data-dictionary resource: schema-to-table overview plus
    /// registry-driven query patterns and type notes for the vendor tag.
    async fn render_data_dictionary(&self, conn: &mut AnyConnection) -> String {
        let db_type = self.database_type.name();

        let mut out = String::new();
        out.push_str("Data Dictionary\n");
        out.push_str("===============\n\n");

        out.push_str("Tables and Views:\n");
        match metadata::list_tables(conn, self.backend).await {
            Ok(tables) if !tables.is_empty() => {
                for table in &tables {
                    let qualified = match &table.schema {
                        Some(schema) => format!(
                            "{}.{}",
                            sanitize_identifier(Some(schema)),
                            sanitize_identifier(Some(&table.name))
                        ),
                        None => sanitize_identifier(Some(&table.name)),
                    };
                    out.push_str(&format!("  {qualified} ({})\n", table.entry_type));
                }
            }
            Ok(_) => out.push_str("  (no tables visible)\n"),
            Err(e) => {
                debug!(error = %e, "unable to enumerate tables for data dictionary");
                out.push_str("  Unable to retrieve\n");
            }
        }

        out.push_str(&format!("\nCommon Query Patterns ({db_type}):\n"));
        out.push_str(&messages::database_help(db_type, "queryPatterns"));
        out.push('\n');

        out.push_str("\nData Type Notes:\n");
        out.push_str(&messages::database_help(db_type, "dataTypes"));
        out.push('\n');

        out
    }
}

/// Prepare and run one statement on one connection, producing either a
/// capped result set or the synthetic `affected_rows` result.
async fn run_statement(
    conn: &mut AnyConnection,
    sql: &str,
    max_rows: u64,
    params: &[ParamValue],
) -> Result<QueryResult, ServerError> {
    let statement = conn.prepare(sql).await?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            ParamValue::Null => query.bind(Option::<String>::None),
            ParamValue::Bool(b) => query.bind(*b),
            ParamValue::Int(i) => query.bind(*i),
            ParamValue::Float(f) => query.bind(*f),
            ParamValue::Text(s) => query.bind(s.clone()),
        };
    }

    if columns.is_empty() {
        // No result set: DML/DDL. Report the update count.
        let done = query.execute(&mut *conn).await?;
        let affected = done.rows_affected();
        return Ok(QueryResult {
            columns: vec!["affected_rows".to_string()],
            rows: vec![vec![Value::from(affected)]],
            row_count: 1,
            execution_time_ms: 0,
        });
    }

    let mut rows = Vec::new();
    let mut stream = query.fetch(&mut *conn);
    while let Some(row) = stream.try_next().await? {
        if (rows.len() as u64) >= max_rows {
            break;
        }
        rows.push(convert::row_to_values(&row));
    }

    let row_count = rows.len();
    Ok(QueryResult {
        columns,
        rows,
        row_count,
        execution_time_ms: 0,
    })
}
