//! Generic cell decoding for `AnyRow` results.
//!
//! The Any driver erases backend types, so decoding inspects the column
//! type-info name and falls back through a chain of concrete extractions.
//! Cells preserve their native JSON shape: numbers stay numbers, booleans
//! stay booleans, SQL NULL becomes JSON null.

use serde_json::Value;
use sqlx::any::AnyRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Decode every cell of a row, in declared column order.
pub fn row_to_values(row: &AnyRow) -> Vec<Value> {
    row.columns()
        .iter()
        .map(|col| decode_cell(row, col.ordinal(), &col.type_info().name().to_uppercase()))
        .collect()
}

/// Column names of a row, in declared order.
pub fn column_names(row: &AnyRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn decode_cell(row: &AnyRow, ordinal: usize, type_name: &str) -> Value {
    if let Ok(raw) = row.try_get_raw(ordinal) {
        if raw.is_null() {
            return Value::Null;
        }
    }

    match type_name {
        "BOOL" | "BOOLEAN" => {
            if let Ok(v) = row.try_get::<bool, _>(ordinal) {
                return Value::Bool(v);
            }
        }
        "INT2" | "SMALLINT" | "TINYINT" => {
            if let Ok(v) = row.try_get::<i16, _>(ordinal) {
                return Value::Number(v.into());
            }
        }
        "INT" | "INT4" | "INTEGER" | "MEDIUMINT" => {
            if let Ok(v) = row.try_get::<i32, _>(ordinal) {
                return Value::Number(v.into());
            }
        }
        "INT8" | "BIGINT" => {
            if let Ok(v) = row.try_get::<i64, _>(ordinal) {
                return Value::Number(v.into());
            }
        }
        "FLOAT4" | "REAL" | "FLOAT" | "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" | "NUMERIC"
        | "DECIMAL" => {
            if let Ok(v) = row.try_get::<f64, _>(ordinal) {
                return serde_json::Number::from_f64(v)
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
            }
        }
        "BYTEA" | "BLOB" | "BINARY" | "VARBINARY" | "LONGBLOB" | "MEDIUMBLOB" | "TINYBLOB" => {
            if let Ok(v) = row.try_get::<Vec<u8>, _>(ordinal) {
                return Value::String(format!("(blob: {} bytes)", v.len()));
            }
        }
        // Text types and everything else fall through to the chain below
        _ => {}
    }

    if let Ok(v) = row.try_get::<i64, _>(ordinal) {
        return Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<f64, _>(ordinal) {
        if let Some(n) = serde_json::Number::from_f64(v) {
            return Value::Number(n);
        }
    }
    if let Ok(v) = row.try_get::<bool, _>(ordinal) {
        return Value::Bool(v);
    }
    if let Ok(v) = row.try_get::<String, _>(ordinal) {
        return Value::String(v);
    }

    Value::Null
}

/// Render a decoded cell for text output. `None` signals SQL NULL so the
/// sanitizer can apply its documented `"NULL"` literal.
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&Value::Null), None);
        assert_eq!(display_value(&json!("text")), Some("text".to_string()));
        assert_eq!(display_value(&json!(42)), Some("42".to_string()));
        assert_eq!(display_value(&json!(1.5)), Some("1.5".to_string()));
        assert_eq!(display_value(&json!(true)), Some("true".to_string()));
    }
}
