//! Select-only SQL validation.
//!
//! This is a coarse allow/deny filter, not a SQL parser. It normalizes the
//! statement and rejects write-shaped first tokens, interior statement
//! separators, and comments. Anything it accepts still runs under the
//! database user's own permissions.

use std::fmt;

/// Reason a statement was rejected by the select-only filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlRejection {
    /// Statement was empty after trimming.
    Empty,
    /// First token is a write/DDL/execution keyword.
    OperationNotAllowed(String),
    /// A `;` appears anywhere but as the final character.
    MultipleStatements,
    /// Statement contains `--` or `/*`.
    CommentsNotAllowed,
}

impl fmt::Display for SqlRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "SQL query is empty"),
            Self::OperationNotAllowed(token) => {
                write!(f, "Operation not allowed in select-only mode: {token}")
            }
            Self::MultipleStatements => write!(f, "Multiple statements are not allowed"),
            Self::CommentsNotAllowed => write!(f, "SQL comments are not allowed"),
        }
    }
}

/// First tokens rejected in select-only mode.
const DENIED_FIRST_TOKENS: &[&str] = &[
    "drop", "truncate", "delete", "update", "insert", "create", "alter", "grant", "revoke",
    "exec", "execute", "call",
];

/// Validate a statement for select-only mode.
///
/// Normalization: trim, lower-case, collapse whitespace runs to single
/// spaces. The checks run against the normalized text.
pub fn validate_select_only(sql: &str) -> Result<(), SqlRejection> {
    let normalized = sql
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if normalized.is_empty() {
        return Err(SqlRejection::Empty);
    }

    let first_token = normalized.split(' ').next().unwrap_or("");
    // strip a trailing separator so "select;" still yields "select"
    let first_token = first_token.trim_end_matches(';');
    if DENIED_FIRST_TOKENS.contains(&first_token) {
        return Err(SqlRejection::OperationNotAllowed(first_token.to_string()));
    }

    if let Some(pos) = normalized.find(';') {
        if pos != normalized.len() - 1 {
            return Err(SqlRejection::MultipleStatements);
        }
    }

    if normalized.contains("--") || normalized.contains("/*") {
        return Err(SqlRejection::CommentsNotAllowed);
    }

    Ok(())
}
