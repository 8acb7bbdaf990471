//! Vendor-specific metadata introspection.
//!
//! Each backend exposes its catalog differently: SQLite through PRAGMA
//! calls, PostgreSQL and MySQL through `information_schema` (plus
//! `pg_indexes` / `statistics` for indexes). Optional lookups (keys,
//! indexes, schemas, vendor facts) degrade to empty results at DEBUG;
//! required lookups (tables, columns) surface their errors.

use crate::database::convert::{display_value, row_to_values};
use crate::database::Backend;
use crate::error::ServerError;
use serde::{Deserialize, Serialize};
use sqlx::AnyConnection;
use sqlx::Row;
use tracing::debug;

/// A table or view visible to the connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,
    /// `TABLE` or `VIEW`.
    pub entry_type: String,
    pub schema: Option<String>,
}

/// Column metadata for the table resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
    pub size: Option<i64>,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub remarks: Option<String>,
}

/// Foreign key edge for the table resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyMeta {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
    pub fk_name: String,
}

/// Index metadata for the table resource, deduplicated by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub name: String,
    pub unique: bool,
    pub index_type: Option<String>,
}

/// Vendor facts for the info resource. Every field is an optional lookup.
#[derive(Debug, Clone, Default)]
pub struct VendorInfo {
    pub product_version: Option<String>,
    pub character_set: Option<String>,
    pub collation: Option<String>,
    pub timezone: Option<String>,
}

/// List tables and views visible to the connection, ordered by name.
pub async fn list_tables(
    conn: &mut AnyConnection,
    backend: Backend,
) -> Result<Vec<TableEntry>, ServerError> {
    match backend {
        Backend::Sqlite => {
            let rows = sqlx::query(
                "SELECT name, type FROM sqlite_master \
                 WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
            )
            .fetch_all(&mut *conn)
            .await?;
            Ok(rows
                .iter()
                .map(|row| TableEntry {
                    name: row.try_get::<String, _>(0).unwrap_or_default(),
                    entry_type: match row.try_get::<String, _>(1).as_deref() {
                        Ok("view") => "VIEW".to_string(),
                        _ => "TABLE".to_string(),
                    },
                    schema: None,
                })
                .collect())
        }
        Backend::Postgres => {
            let rows = sqlx::query(
                "SELECT table_name, table_type, table_schema \
                 FROM information_schema.tables \
                 WHERE table_schema NOT IN ('pg_catalog', 'information_schema') \
                 ORDER BY table_name",
            )
            .fetch_all(&mut *conn)
            .await?;
            Ok(rows.iter().map(entry_from_information_schema).collect())
        }
        Backend::MySql => {
            let rows = sqlx::query(
                "SELECT table_name, table_type, table_schema \
                 FROM information_schema.tables \
                 WHERE table_schema = DATABASE() \
                 ORDER BY table_name",
            )
            .fetch_all(&mut *conn)
            .await?;
            Ok(rows.iter().map(entry_from_information_schema).collect())
        }
    }
}

fn entry_from_information_schema(row: &sqlx::any::AnyRow) -> TableEntry {
    let raw_type: String = row.try_get(1).unwrap_or_default();
    TableEntry {
        name: row.try_get(0).unwrap_or_default(),
        entry_type: if raw_type.to_uppercase().contains("VIEW") {
            "VIEW".to_string()
        } else {
            "TABLE".to_string()
        },
        schema: row.try_get(2).ok(),
    }
}

/// List non-empty schema names. Backends without schema support (SQLite)
/// and enumeration failures both produce an empty list; failures are
/// logged at DEBUG only.
pub async fn list_schemas(conn: &mut AnyConnection, backend: Backend) -> Vec<String> {
    let sql = match backend {
        Backend::Sqlite => return Vec::new(),
        Backend::Postgres => {
            "SELECT schema_name FROM information_schema.schemata \
             WHERE schema_name NOT IN ('pg_catalog', 'information_schema') \
             ORDER BY schema_name"
        }
        Backend::MySql => {
            "SELECT schema_name FROM information_schema.schemata \
             WHERE schema_name NOT IN \
             ('mysql', 'information_schema', 'performance_schema', 'sys') \
             ORDER BY schema_name"
        }
    };

    match sqlx::query(sql).fetch_all(&mut *conn).await {
        Ok(rows) => rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>(0).ok())
            .filter(|name| !name.is_empty())
            .collect(),
        Err(e) => {
            debug!(error = %e, "schema enumeration unsupported or failed");
            Vec::new()
        }
    }
}

/// Column metadata in ordinal order. Empty result means the table does
/// not exist (callers verify existence separately for a cleaner message).
pub async fn table_columns(
    conn: &mut AnyConnection,
    backend: Backend,
    table: &str,
) -> Result<Vec<ColumnMeta>, ServerError> {
    match backend {
        Backend::Sqlite => {
            let sql = format!("PRAGMA table_info({})", quote_identifier(table));
            let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
            Ok(rows
                .iter()
                .map(|row| ColumnMeta {
                    name: row.try_get("name").unwrap_or_default(),
                    data_type: row.try_get("type").unwrap_or_default(),
                    size: None,
                    nullable: row.try_get::<i64, _>("notnull").unwrap_or(0) == 0,
                    default_value: row.try_get("dflt_value").ok(),
                    remarks: None,
                })
                .collect())
        }
        Backend::Postgres => {
            let rows = sqlx::query(
                "SELECT c.column_name, c.data_type, c.character_maximum_length, \
                        c.is_nullable, c.column_default, pgd.description \
                 FROM information_schema.columns c \
                 LEFT JOIN pg_catalog.pg_statio_all_tables st \
                   ON c.table_schema = st.schemaname AND c.table_name = st.relname \
                 LEFT JOIN pg_catalog.pg_description pgd \
                   ON pgd.objoid = st.relid AND pgd.objsubid = c.ordinal_position \
                 WHERE c.table_name = $1 \
                 ORDER BY c.ordinal_position",
            )
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;
            Ok(rows.iter().map(column_from_information_schema).collect())
        }
        Backend::MySql => {
            let rows = sqlx::query(
                "SELECT column_name, data_type, character_maximum_length, \
                        is_nullable, column_default, column_comment \
                 FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = ? \
                 ORDER BY ordinal_position",
            )
            .bind(table)
            .fetch_all(&mut *conn)
            .await?;
            Ok(rows.iter().map(column_from_information_schema).collect())
        }
    }
}

fn column_from_information_schema(row: &sqlx::any::AnyRow) -> ColumnMeta {
    let nullable: String = row.try_get(3).unwrap_or_else(|_| "YES".to_string());
    let remarks: Option<String> = row.try_get(5).ok();
    ColumnMeta {
        name: row.try_get(0).unwrap_or_default(),
        data_type: row.try_get(1).unwrap_or_default(),
        size: row.try_get::<i64, _>(2).ok(),
        nullable: nullable.eq_ignore_ascii_case("yes"),
        default_value: row.try_get(4).ok(),
        remarks: remarks.filter(|r| !r.is_empty()),
    }
}

/// Primary key column names. Optional lookup: failures degrade to empty.
pub async fn primary_keys(conn: &mut AnyConnection, backend: Backend, table: &str) -> Vec<String> {
    let result = match backend {
        Backend::Sqlite => {
            let sql = format!("PRAGMA table_info({})", quote_identifier(table));
            sqlx::query(&sql).fetch_all(&mut *conn).await.map(|rows| {
                rows.iter()
                    .filter(|row| row.try_get::<i64, _>("pk").unwrap_or(0) > 0)
                    .filter_map(|row| row.try_get::<String, _>("name").ok())
                    .collect()
            })
        }
        Backend::Postgres => {
            sqlx::query(
                "SELECT kcu.column_name \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON tc.constraint_name = kcu.constraint_name \
                   AND tc.table_schema = kcu.table_schema \
                 WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_name = $1 \
                 ORDER BY kcu.ordinal_position",
            )
            .bind(table)
            .fetch_all(&mut *conn)
            .await
            .map(collect_first_column)
        }
        Backend::MySql => {
            sqlx::query(
                "SELECT column_name FROM information_schema.key_column_usage \
                 WHERE table_schema = DATABASE() AND table_name = ? \
                   AND constraint_name = 'PRIMARY' \
                 ORDER BY ordinal_position",
            )
            .bind(table)
            .fetch_all(&mut *conn)
            .await
            .map(collect_first_column)
        }
    };

    result.unwrap_or_else(|e| {
        debug!(table, error = %e, "unable to retrieve primary keys");
        Vec::new()
    })
}

fn collect_first_column(rows: Vec<sqlx::any::AnyRow>) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.try_get::<String, _>(0).ok())
        .collect()
}

/// Foreign key edges. Optional lookup: failures degrade to empty.
pub async fn foreign_keys(
    conn: &mut AnyConnection,
    backend: Backend,
    table: &str,
) -> Vec<ForeignKeyMeta> {
    let result = match backend {
        Backend::Sqlite => {
            let sql = format!("PRAGMA foreign_key_list({})", quote_identifier(table));
            sqlx::query(&sql).fetch_all(&mut *conn).await.map(|rows| {
                rows.iter()
                    .map(|row| {
                        let id = row.try_get::<i64, _>("id").unwrap_or(0);
                        ForeignKeyMeta {
                            column: row.try_get("from").unwrap_or_default(),
                            ref_table: row.try_get("table").unwrap_or_default(),
                            ref_column: row.try_get("to").unwrap_or_default(),
                            fk_name: format!("fk_{table}_{id}"),
                        }
                    })
                    .collect()
            })
        }
        Backend::Postgres => {
            sqlx::query(
                "SELECT kcu.column_name, ccu.table_name, ccu.column_name, kcu.constraint_name \
                 FROM information_schema.key_column_usage kcu \
                 JOIN information_schema.referential_constraints rc \
                   ON kcu.constraint_name = rc.constraint_name \
                   AND kcu.constraint_schema = rc.constraint_schema \
                 JOIN information_schema.constraint_column_usage ccu \
                   ON rc.unique_constraint_name = ccu.constraint_name \
                   AND rc.unique_constraint_schema = ccu.constraint_schema \
                 WHERE kcu.table_name = $1",
            )
            .bind(table)
            .fetch_all(&mut *conn)
            .await
            .map(|rows| rows.iter().map(fk_from_row).collect())
        }
        Backend::MySql => {
            sqlx::query(
                "SELECT column_name, referenced_table_name, referenced_column_name, \
                        constraint_name \
                 FROM information_schema.key_column_usage \
                 WHERE table_schema = DATABASE() AND table_name = ? \
                   AND referenced_table_name IS NOT NULL",
            )
            .bind(table)
            .fetch_all(&mut *conn)
            .await
            .map(|rows| rows.iter().map(fk_from_row).collect())
        }
    };

    result.unwrap_or_else(|e| {
        debug!(table, error = %e, "unable to retrieve foreign keys");
        Vec::new()
    })
}

fn fk_from_row(row: &sqlx::any::AnyRow) -> ForeignKeyMeta {
    ForeignKeyMeta {
        column: row.try_get(0).unwrap_or_default(),
        ref_table: row.try_get(1).unwrap_or_default(),
        ref_column: row.try_get(2).unwrap_or_default(),
        fk_name: row.try_get(3).unwrap_or_default(),
    }
}

/// Indexes, deduplicated by name. Optional lookup: failures degrade to
/// empty.
pub async fn indexes(conn: &mut AnyConnection, backend: Backend, table: &str) -> Vec<IndexMeta> {
    let result: Result<Vec<IndexMeta>, sqlx::Error> = match backend {
        Backend::Sqlite => {
            let sql = format!("PRAGMA index_list({})", quote_identifier(table));
            sqlx::query(&sql).fetch_all(&mut *conn).await.map(|rows| {
                rows.iter()
                    .map(|row| IndexMeta {
                        name: row.try_get("name").unwrap_or_default(),
                        unique: row.try_get::<i64, _>("unique").unwrap_or(0) != 0,
                        index_type: None,
                    })
                    .collect()
            })
        }
        Backend::Postgres => {
            sqlx::query("SELECT indexname, indexdef FROM pg_indexes WHERE tablename = $1")
                .bind(table)
                .fetch_all(&mut *conn)
                .await
                .map(|rows| {
                    rows.iter()
                        .map(|row| {
                            let def: String = row.try_get(1).unwrap_or_default();
                            IndexMeta {
                                name: row.try_get(0).unwrap_or_default(),
                                unique: def.to_uppercase().starts_with("CREATE UNIQUE"),
                                index_type: index_method_from_def(&def),
                            }
                        })
                        .collect()
                })
        }
        Backend::MySql => {
            sqlx::query(
                "SELECT index_name, non_unique, index_type \
                 FROM information_schema.statistics \
                 WHERE table_schema = DATABASE() AND table_name = ? \
                 ORDER BY index_name, seq_in_index",
            )
            .bind(table)
            .fetch_all(&mut *conn)
            .await
            .map(|rows| {
                rows.iter()
                    .map(|row| IndexMeta {
                        name: row.try_get(0).unwrap_or_default(),
                        unique: row.try_get::<i64, _>(1).unwrap_or(1) == 0,
                        index_type: row.try_get(2).ok(),
                    })
                    .collect()
            })
        }
    };

    let mut seen = std::collections::HashSet::new();
    result
        .unwrap_or_else(|e| {
            debug!(table, error = %e, "unable to retrieve indexes");
            Vec::new()
        })
        .into_iter()
        .filter(|idx| seen.insert(idx.name.clone()))
        .collect()
}

/// Extract the access method from a `CREATE INDEX ... USING <method>`
/// definition.
fn index_method_from_def(def: &str) -> Option<String> {
    let after = def.split(" USING ").nth(1)?;
    after.split_whitespace().next().map(|s| s.to_string())
}

/// Tables and views belonging to one schema.
pub async fn tables_in_schema(
    conn: &mut AnyConnection,
    backend: Backend,
    schema: &str,
) -> Result<Vec<TableEntry>, ServerError> {
    let rows = match backend {
        Backend::Sqlite => return Ok(Vec::new()),
        Backend::Postgres => {
            sqlx::query(
                "SELECT table_name, table_type, table_schema \
                 FROM information_schema.tables WHERE table_schema = $1 \
                 ORDER BY table_name",
            )
            .bind(schema)
            .fetch_all(&mut *conn)
            .await?
        }
        Backend::MySql => {
            sqlx::query(
                "SELECT table_name, table_type, table_schema \
                 FROM information_schema.tables WHERE table_schema = ? \
                 ORDER BY table_name",
            )
            .bind(schema)
            .fetch_all(&mut *conn)
            .await?
        }
    };
    Ok(rows.iter().map(entry_from_information_schema).collect())
}

/// Gather vendor facts for the info resource. Every lookup is
/// individually try-wrapped; a missing fact renders as "Unable to
/// retrieve".
pub async fn vendor_info(conn: &mut AnyConnection, backend: Backend) -> VendorInfo {
    match backend {
        Backend::Sqlite => VendorInfo {
            product_version: scalar(conn, "SELECT sqlite_version()").await,
            character_set: scalar(conn, "PRAGMA encoding").await,
            collation: None,
            timezone: None,
        },
        Backend::Postgres => VendorInfo {
            product_version: scalar(conn, "SELECT version()").await,
            character_set: scalar(conn, "SHOW server_encoding").await,
            collation: scalar(conn, "SHOW lc_collate").await,
            timezone: scalar(conn, "SHOW timezone").await,
        },
        Backend::MySql => VendorInfo {
            product_version: scalar(conn, "SELECT version()").await,
            character_set: scalar(conn, "SELECT @@character_set_database").await,
            collation: scalar(conn, "SELECT @@collation_database").await,
            timezone: scalar(conn, "SELECT @@system_time_zone").await,
        },
    }
}

/// Run a single-value lookup, degrading to `None` at DEBUG on any failure.
async fn scalar(conn: &mut AnyConnection, sql: &str) -> Option<String> {
    match sqlx::query(sql).fetch_optional(&mut *conn).await {
        Ok(Some(row)) => row_to_values(&row).first().and_then(display_value),
        Ok(None) => None,
        Err(e) => {
            debug!(sql, error = %e, "vendor lookup failed");
            None
        }
    }
}

/// Double-quote an identifier for interpolation into PRAGMA calls, which
/// cannot be parameterized.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_index_method_from_def() {
        assert_eq!(
            index_method_from_def("CREATE INDEX i ON t USING btree (a)"),
            Some("btree".to_string())
        );
        assert_eq!(index_method_from_def("CREATE INDEX i ON t (a)"), None);
    }

    async fn sqlite_conn() -> AnyConnection {
        use sqlx::Connection;
        sqlx::any::install_default_drivers();
        AnyConnection::connect("sqlite::memory:").await.unwrap()
    }

    async fn seed(conn: &mut AnyConnection) {
        use sqlx::Executor;
        conn.execute(
            "CREATE TABLE users (\
                 id INTEGER PRIMARY KEY, \
                 name TEXT NOT NULL, \
                 email TEXT DEFAULT 'none')",
        )
        .await
        .unwrap();
        conn.execute("CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id))")
            .await
            .unwrap();
        conn.execute("CREATE UNIQUE INDEX idx_users_email ON users(email)")
            .await
            .unwrap();
        conn.execute("CREATE VIEW user_names AS SELECT name FROM users")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sqlite_list_tables() {
        let mut conn = sqlite_conn().await;
        seed(&mut conn).await;

        let tables = list_tables(&mut conn, Backend::Sqlite).await.unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders", "user_names", "users"]);
        assert_eq!(
            tables.iter().find(|t| t.name == "user_names").unwrap().entry_type,
            "VIEW"
        );
    }

    #[tokio::test]
    async fn test_sqlite_columns_and_keys() {
        let mut conn = sqlite_conn().await;
        seed(&mut conn).await;

        let columns = table_columns(&mut conn, Backend::Sqlite, "users").await.unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "id");
        assert!(!columns[1].nullable);
        assert_eq!(columns[2].default_value.as_deref(), Some("'none'"));

        let pks = primary_keys(&mut conn, Backend::Sqlite, "users").await;
        assert_eq!(pks, vec!["id"]);

        let fks = foreign_keys(&mut conn, Backend::Sqlite, "orders").await;
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].column, "user_id");
        assert_eq!(fks[0].ref_table, "users");

        let idx = indexes(&mut conn, Backend::Sqlite, "users").await;
        assert!(idx.iter().any(|i| i.name == "idx_users_email" && i.unique));
    }

    #[tokio::test]
    async fn test_sqlite_missing_table_columns_empty() {
        let mut conn = sqlite_conn().await;
        let columns = table_columns(&mut conn, Backend::Sqlite, "ghost").await.unwrap();
        assert!(columns.is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_schemas_empty() {
        let mut conn = sqlite_conn().await;
        assert!(list_schemas(&mut conn, Backend::Sqlite).await.is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_vendor_info() {
        let mut conn = sqlite_conn().await;
        let info = vendor_info(&mut conn, Backend::Sqlite).await;
        assert!(info.product_version.is_some());
    }
}
