//! JSON-RPC 2.0 frame construction.
//!
//! A message is a request when the `id` key is present, even when its
//! value is JSON null; without the key it is a notification. Response ids
//! echo the request id verbatim with its exact JSON type.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

/// Whether a decoded message is a request (carries an `id` key).
pub fn is_request(message: &Value) -> bool {
    message
        .as_object()
        .is_some_and(|obj| obj.contains_key("id"))
}

/// Build a success response echoing the request id.
pub fn success_response(id: &Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

/// Build an error response. A missing id serializes as null per JSON-RPC.
pub fn error_response(id: Option<&Value>, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id.cloned().unwrap_or(Value::Null),
        "error": {
            "code": code,
            "message": message,
        },
    })
}

static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""id"\s*:\s*("(?:[^"\\]|\\.)*"|-?\d+(?:\.\d+)?|null|true|false)"#)
        .unwrap_or_else(|e| panic!("Internal error: invalid id recovery pattern: {e}"))
});

/// Best-effort id extraction from a frame that failed to parse, so the
/// error response can still echo it.
pub fn recover_id(raw: &str) -> Option<Value> {
    let captured = ID_PATTERN.captures(raw)?.get(1)?.as_str();
    serde_json::from_str(captured).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_detection() {
        assert!(is_request(&json!({"id": 1, "method": "ping"})));
        assert!(is_request(&json!({"id": null, "method": "ping"})));
        assert!(is_request(&json!({"id": "abc", "method": "ping"})));
        assert!(!is_request(&json!({"method": "notifications/initialized"})));
        assert!(!is_request(&json!("not an object")));
    }

    #[test]
    fn test_id_echoed_with_type() {
        let resp = success_response(&json!(42), json!({}));
        assert_eq!(resp["id"], json!(42));

        let resp = success_response(&json!("abc"), json!({}));
        assert_eq!(resp["id"], json!("abc"));

        let resp = success_response(&Value::Null, json!({}));
        assert!(resp["id"].is_null());
        // serialized, not omitted
        assert!(serde_json::to_string(&resp).unwrap().contains("\"id\":null"));
    }

    #[test]
    fn test_error_response_shape() {
        let resp = error_response(Some(&json!(7)), -32601, "Method not found: nope");
        assert_eq!(resp["id"], json!(7));
        assert_eq!(resp["error"]["code"], json!(-32601));
        assert!(resp["error"]["message"].as_str().unwrap().contains("nope"));

        let resp = error_response(None, -32603, "boom");
        assert!(resp["id"].is_null());
    }

    #[test]
    fn test_recover_id() {
        assert_eq!(recover_id(r#"{"id": 42, "method": "x", BROKEN"#), Some(json!(42)));
        assert_eq!(
            recover_id(r#"{"id": "abc", BROKEN"#),
            Some(json!("abc"))
        );
        assert_eq!(recover_id(r#"{"id": null, BROKEN"#), Some(Value::Null));
        assert_eq!(recover_id("total garbage"), None);
    }
}
