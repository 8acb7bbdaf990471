//! Keyed message-template registry.
//!
//! Messages live in external `templates/*.properties` files (embedded at
//! compile time) rather than compiled-in strings, so wording stays
//! versionable without touching core code. Three namespaces exist:
//! per-vendor database help, security warnings, and error messages.
//!
//! Every lookup is total: unknown namespaces, keys, or vendors produce a
//! documented fallback string containing the missing key. A template with
//! more placeholders than supplied arguments is returned unformatted and
//! logged at WARN. Nothing in this module panics or returns an error.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Embedded template sources, one entry per namespace.
const TEMPLATE_SOURCES: &[(&str, &str)] = &[
    ("errors", include_str!("../templates/errors.properties")),
    ("warnings", include_str!("../templates/warnings.properties")),
    ("help_mysql", include_str!("../templates/help_mysql.properties")),
    ("help_mariadb", include_str!("../templates/help_mariadb.properties")),
    (
        "help_postgresql",
        include_str!("../templates/help_postgresql.properties"),
    ),
    ("help_sqlite", include_str!("../templates/help_sqlite.properties")),
    ("help_h2", include_str!("../templates/help_h2.properties")),
    ("help_oracle", include_str!("../templates/help_oracle.properties")),
    (
        "help_sqlserver",
        include_str!("../templates/help_sqlserver.properties"),
    ),
];

type Namespace = Arc<HashMap<String, String>>;

/// Parsed namespaces, loaded once each on first access.
///
/// Concurrent first-access is safe: parsing is idempotent, last write wins.
static CACHE: Lazy<RwLock<HashMap<&'static str, Namespace>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Look up a database-help template for a vendor tag.
///
/// Returns `[missing help: <db_type>/<key>]` when the vendor has no help
/// file or the key is absent.
pub fn database_help(db_type: &str, key: &str) -> String {
    let ns = format!("help_{db_type}");
    match namespace_static(&ns).and_then(|n| n.get(key).cloned()) {
        Some(template) => template,
        None => format!("[missing help: {db_type}/{key}]"),
    }
}

/// Look up and format a security-warning template.
pub fn security_warning(key: &str, args: &[&str]) -> String {
    lookup("warnings", key, args)
}

/// Look up and format an error-message template.
pub fn error_message(key: &str, args: &[&str]) -> String {
    lookup("errors", key, args)
}

fn lookup(namespace: &'static str, key: &str, args: &[&str]) -> String {
    let Some(ns) = namespace_by_name(namespace) else {
        return format!("[missing message: {namespace}/{key}]");
    };
    match ns.get(key) {
        Some(template) => format_template(template, args),
        None => format!("[missing message: {namespace}/{key}]"),
    }
}

fn namespace_static(name: &str) -> Option<Namespace> {
    let static_name = TEMPLATE_SOURCES
        .iter()
        .map(|(n, _)| *n)
        .find(|n| *n == name)?;
    namespace_by_name(static_name)
}

fn namespace_by_name(name: &'static str) -> Option<Namespace> {
    if let Some(ns) = CACHE.read().get(name) {
        return Some(ns.clone());
    }
    let source = TEMPLATE_SOURCES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, s)| *s)?;
    let parsed = Arc::new(parse_properties(source));
    CACHE.write().insert(name, parsed.clone());
    Some(parsed)
}

/// Parse `KEY=VALUE` lines. `#` starts a comment, blank lines are skipped,
/// and `\n` escapes embed newlines in values.
fn parse_properties(source: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            map.insert(
                key.trim().to_string(),
                value.trim().replace("\\n", "\n"),
            );
        }
    }
    map
}

/// Substitute `{0}`, `{1}`, ... with positional arguments.
///
/// A placeholder with no matching argument means the caller and template
/// disagree; the unformatted template is returned so the message is still
/// usable, and the mismatch is logged at WARN.
fn format_template(template: &str, args: &[&str]) -> String {
    let mut highest_needed = None;
    let mut idx = 0;
    while let Some(open) = template[idx..].find('{') {
        let start = idx + open;
        if let Some(close) = template[start..].find('}') {
            if let Ok(n) = template[start + 1..start + close].parse::<usize>() {
                if highest_needed.map_or(true, |h| n > h) {
                    highest_needed = Some(n);
                }
            }
            idx = start + close + 1;
        } else {
            break;
        }
    }

    if let Some(h) = highest_needed {
        if h >= args.len() {
            warn!(
                placeholders = h + 1,
                supplied = args.len(),
                "template expects more arguments than supplied; returning unformatted"
            );
            return template.to_string();
        }
    }

    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_formatting() {
        let msg = error_message("versionMismatch", &["2024-11-05", "2025-06-18"]);
        assert!(msg.contains("2024-11-05"));
        assert!(msg.contains("2025-06-18"));
        assert!(!msg.contains("{0}"));
    }

    #[test]
    fn test_unknown_key_fallback() {
        let msg = error_message("noSuchKey", &[]);
        assert!(msg.contains("noSuchKey"));
    }

    #[test]
    fn test_unknown_help_vendor_fallback() {
        let msg = database_help("foodb", "dialectGuidance");
        assert!(msg.contains("foodb"));
        assert!(msg.contains("dialectGuidance"));
    }

    #[test]
    fn test_known_help_vendor() {
        let msg = database_help("postgresql", "dialectGuidance");
        assert!(msg.contains("PostgreSQL"));
    }

    #[test]
    fn test_too_few_arguments_returns_unformatted() {
        // versionMismatch needs two arguments
        let msg = error_message("versionMismatch", &["2024-11-05"]);
        assert!(msg.contains("{0}") || msg.contains("{1}"));
    }

    #[test]
    fn test_security_warning_lookup() {
        let msg = security_warning("resultHeader", &[]);
        assert!(msg.contains("UNTRUSTED"));
    }

    #[test]
    fn test_multiline_escape() {
        let msg = database_help("sqlite", "queryPatterns");
        assert!(msg.contains('\n'));
    }

    #[test]
    fn test_parse_properties() {
        let parsed = parse_properties("# comment\n\nkey=value\nspaced = padded value \n");
        assert_eq!(parsed.get("key").map(String::as_str), Some("value"));
        assert_eq!(parsed.get("spaced").map(String::as_str), Some("padded value"));
        assert_eq!(parsed.len(), 2);
    }
}
