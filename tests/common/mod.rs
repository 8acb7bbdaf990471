//! Shared test fixtures: an in-memory SQLite server behind the router.

// Not every test binary uses every helper.
#![allow(dead_code)]

use dbmcp::constants::PROTOCOL_VERSION;
use dbmcp::{DatabaseService, McpRouter, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub fn sqlite_config(select_only: bool) -> ServerConfig {
    ServerConfig {
        url: "sqlite::memory:".to_string(),
        user: String::new(),
        password: String::new(),
        driver: "sqlite".to_string(),
        max_connections: 1,
        connection_timeout: Duration::from_millis(5_000),
        query_timeout: Duration::from_secs(5),
        select_only,
        max_sql_length: 10_000,
        max_rows_limit: 100,
        idle_timeout: Duration::from_millis(600_000),
        max_lifetime: Duration::from_millis(1_800_000),
        leak_detection_threshold: Duration::from_millis(60_000),
    }
}

pub async fn router(select_only: bool) -> McpRouter {
    let config = Arc::new(sqlite_config(select_only));
    let service = Arc::new(DatabaseService::connect(config.clone()).await.unwrap());
    McpRouter::new(service, config)
}

/// A router taken through the full handshake.
pub async fn initialized_router(select_only: bool) -> McpRouter {
    let router = router(select_only).await;

    let response = router
        .handle(json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {"protocolVersion": PROTOCOL_VERSION, "capabilities": {}},
        }))
        .await
        .expect("initialize must respond");
    assert!(response.get("error").is_none(), "handshake failed: {response}");

    let none = router
        .handle(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    assert!(none.is_none(), "notification must not produce a response");

    router
}

/// Invoke `run_sql` and return the JSON-RPC response.
pub async fn run_sql(router: &McpRouter, id: Value, sql: &str) -> Value {
    router
        .handle(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": "run_sql", "arguments": {"sql": sql}},
        }))
        .await
        .expect("tools/call must respond")
}

/// Text content of a tool-result envelope.
pub fn envelope_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("tool result must carry text content")
}
