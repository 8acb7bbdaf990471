//! Tool definitions and invocation.
//!
//! The server exposes exactly two tools: `run_sql` and `describe_table`.
//! Tool results travel in the MCP content envelope; SQL failures set
//! `isError: true` inside a JSON-RPC *success* response so the client can
//! read the enhanced error text.

use crate::config::ServerConfig;
use crate::constants::{
    DEFAULT_MAX_ROWS, MAX_SCHEMA_NAME_LENGTH, MAX_TABLE_NAME_LENGTH,
};
use crate::database::{DatabaseService, ParamValue};
use crate::error::ServerError;
use crate::format::format_table;
use crate::messages;
use serde_json::{json, Map, Value};
use tracing::warn;

/// Tool name for SQL execution.
pub const TOOL_RUN_SQL: &str = "run_sql";

/// Tool name for table description.
pub const TOOL_DESCRIBE_TABLE: &str = "describe_table";

/// Build the static tools array for `tools/list`.
pub fn tool_definitions(config: &ServerConfig) -> Value {
    let db_type = config.database_type().name();
    let default_rows = default_max_rows(config);
    let mode_note = if config.select_only {
        messages::security_warning("selectOnlyNote", &[])
    } else {
        messages::security_warning("writeModeNote", &[])
    };

    let sql_description = format!(
        "{} {}",
        messages::security_warning(
            "sqlToolDescription",
            &[db_type, &config.max_rows_limit.to_string()],
        ),
        mode_note
    );

    let describe_description = format!(
        "{} {}",
        messages::security_warning("describeToolDescription", &[db_type]),
        mode_note
    );

    json!([
        {
            "name": TOOL_RUN_SQL,
            "description": sql_description,
            "inputSchema": {
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": "The SQL statement to execute"
                    },
                    "maxRows": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": config.max_rows_limit,
                        "default": default_rows,
                        "description": "Row cap for the result set"
                    },
                    "params": {
                        "type": "array",
                        "items": {
                            "type": ["string", "number", "boolean", "null"]
                        },
                        "description": "Positional values bound to statement placeholders"
                    }
                },
                "required": ["sql"],
                "additionalProperties": false
            },
            "security": security_extension(config)
        },
        {
            "name": TOOL_DESCRIBE_TABLE,
            "description": describe_description,
            "inputSchema": {
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "minLength": 1,
                        "maxLength": MAX_TABLE_NAME_LENGTH,
                        "description": "Name of the table to describe"
                    },
                    "schema": {
                        "type": "string",
                        "maxLength": MAX_SCHEMA_NAME_LENGTH,
                        "description": "Schema containing the table"
                    }
                },
                "required": ["table_name"],
                "additionalProperties": false
            },
            "security": security_extension(config)
        }
    ])
}

/// The row cap applied when the client omits `maxRows`, never above the
/// configured limit.
fn default_max_rows(config: &ServerConfig) -> u64 {
    DEFAULT_MAX_ROWS.min(config.max_rows_limit)
}

/// Vendor security extension advertised with each tool and result.
pub fn security_extension(config: &ServerConfig) -> Value {
    json!({
        "untrustedOutput": true,
        "sanitized": true,
        "selectOnly": config.select_only,
        "maxRowsLimit": config.max_rows_limit,
    })
}

/// Dispatch a `tools/call` by tool name.
pub async fn call_tool(
    service: &DatabaseService,
    config: &ServerConfig,
    name: &str,
    arguments: &Map<String, Value>,
) -> Result<Value, ServerError> {
    match name {
        TOOL_RUN_SQL => run_sql(service, config, arguments).await,
        TOOL_DESCRIBE_TABLE => describe_table(service, config, arguments).await,
        other => Err(ServerError::invalid_params(messages::error_message(
            "unknownTool",
            &[other],
        ))),
    }
}

async fn run_sql(
    service: &DatabaseService,
    config: &ServerConfig,
    arguments: &Map<String, Value>,
) -> Result<Value, ServerError> {
    let sql = match arguments.get("sql") {
        None | Some(Value::Null) => {
            return Err(ServerError::invalid_params(messages::error_message(
                "sqlRequired",
                &[],
            )))
        }
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(ServerError::invalid_params(messages::error_message(
                "sqlRequired",
                &[],
            )))
        }
    };

    if sql.trim().is_empty() {
        return Err(ServerError::invalid_params(messages::error_message(
            "sqlEmpty",
            &[],
        )));
    }

    if sql.len() > config.max_sql_length {
        return Err(ServerError::invalid_params(messages::error_message(
            "sqlTooLong",
            &[&config.max_sql_length.to_string()],
        )));
    }

    let max_rows = match arguments.get("maxRows") {
        None | Some(Value::Null) => default_max_rows(config),
        Some(value) => match value.as_u64() {
            Some(n) if n >= 1 => n,
            _ => {
                return Err(ServerError::invalid_params(messages::error_message(
                    "maxRowsNotPositive",
                    &[],
                )))
            }
        },
    };
    if max_rows > config.max_rows_limit {
        return Err(ServerError::invalid_params(messages::error_message(
            "maxRowsExceeded",
            &[&max_rows.to_string(), &config.max_rows_limit.to_string()],
        )));
    }

    let params: Vec<ParamValue> = match arguments.get("params") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => values.iter().map(ParamValue::from_json).collect(),
        Some(_) => {
            return Err(ServerError::invalid_params(
                "params must be an array of primitive values",
            ))
        }
    };

    match service.execute_sql(sql, max_rows, &params).await {
        Ok(result) => {
            let summary = format!(
                "Status: success\nRows: {}\nExecution time: {} ms\nDatabase type: {}",
                result.row_count,
                result.execution_time_ms,
                service.database_type().name(),
            );
            let text = format!(
                "{}\n\n{}\n\n{}\n{}",
                messages::security_warning("resultHeader", &[]),
                summary,
                format_table(&result),
                messages::security_warning("resultFooter", &[]),
            );
            Ok(tool_envelope(text, false, security_extension(config)))
        }
        Err(err) if err.is_tool_level() => {
            warn!(error = %err, "run_sql failed");
            let text = enhance_sql_error(&err.to_string(), service);
            Ok(tool_envelope(text, true, security_extension(config)))
        }
        Err(err) => Err(err),
    }
}

async fn describe_table(
    service: &DatabaseService,
    config: &ServerConfig,
    arguments: &Map<String, Value>,
) -> Result<Value, ServerError> {
    let table_name = match arguments.get("table_name") {
        None | Some(Value::Null) => {
            return Err(ServerError::invalid_params(messages::error_message(
                "tableNameRequired",
                &[],
            )))
        }
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(_) => {
            return Err(ServerError::invalid_params(messages::error_message(
                "tableNameRequired",
                &[],
            )))
        }
    };

    if table_name.chars().count() > MAX_TABLE_NAME_LENGTH {
        return Err(ServerError::invalid_params(messages::error_message(
            "tableNameTooLong",
            &[&MAX_TABLE_NAME_LENGTH.to_string()],
        )));
    }

    let schema = match arguments.get("schema") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            if s.chars().count() > MAX_SCHEMA_NAME_LENGTH {
                return Err(ServerError::invalid_params(messages::error_message(
                    "schemaNameTooLong",
                    &[&MAX_SCHEMA_NAME_LENGTH.to_string()],
                )));
            }
            Some(s.as_str())
        }
        Some(_) => {
            return Err(ServerError::invalid_params("schema must be a string"));
        }
    };

    match service.read_table_resource(table_name, schema).await {
        Ok(Some(resource)) => {
            let text = resource.content.unwrap_or_default();
            Ok(tool_envelope(text, false, security_extension(config)))
        }
        Ok(None) => {
            let db_type = service.database_type().name();
            let text = format!(
                "{}\nHint: {}",
                messages::error_message("tableNotFound", &[table_name]),
                messages::database_help(db_type, "tableNotFoundHint"),
            );
            Ok(tool_envelope(text, true, security_extension(config)))
        }
        Err(err) if err.is_tool_level() => {
            warn!(error = %err, "describe_table failed");
            let text = enhance_sql_error(&err.to_string(), service);
            Ok(tool_envelope(text, true, security_extension(config)))
        }
        Err(err) => Err(err),
    }
}

/// The MCP content envelope for tool results.
fn tool_envelope(text: String, is_error: bool, security: Value) -> Value {
    json!({
        "content": [
            {
                "type": "text",
                "text": text,
            }
        ],
        "isError": is_error,
        "security": security,
    })
}

/// Append vendor troubleshooting hints to a SQL failure message when the
/// failure looks like a missing table or a syntax error.
fn enhance_sql_error(message: &str, service: &DatabaseService) -> String {
    let db_type = service.database_type().name();
    let lower = message.to_lowercase();
    let mut text = format!("Error executing query: {message}");

    if lower.contains("no such table")
        || lower.contains("does not exist")
        || lower.contains("doesn't exist")
        || lower.contains("not found")
    {
        text.push_str(&format!(
            "\nHint: {}",
            messages::database_help(db_type, "tableNotFoundHint")
        ));
    }

    if lower.contains("syntax") {
        text.push_str(&format!(
            "\nHint: {}",
            messages::database_help(db_type, "syntaxErrorHint")
        ));
    }

    text
}
