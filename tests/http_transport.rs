//! HTTP transport behaviors, driven through the axum app without a
//! listening socket.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn mcp_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_connected_database() {
    let router = common::initialized_router(true).await;
    let app = dbmcp::transport::http::app(router);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["server"], json!("dbmcp"));
    assert_eq!(body["state"], json!("initialized"));
    assert_eq!(body["database"], json!("connected"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn post_request_returns_json_response() {
    let router = common::initialized_router(true).await;
    let app = dbmcp::transport::http::app(router);

    let response = app
        .oneshot(mcp_request(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    let body = body_json(response).await;
    assert_eq!(body["id"], json!(1));
    assert!(body["result"]["timestamp"].is_string());
}

#[tokio::test]
async fn notification_returns_204_with_empty_body() {
    let router = common::router(true).await;
    let app = dbmcp::transport::http::app(router.clone());

    // run the handshake over HTTP
    let response = app
        .clone()
        .oneshot(mcp_request(&format!(
            r#"{{"jsonrpc":"2.0","id":1,"method":"initialize","params":{{"protocolVersion":"{}","capabilities":{{}}}}}}"#,
            dbmcp::constants::PROTOCOL_VERSION
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(mcp_request(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn options_preflight_carries_cors_headers() {
    let router = common::router(true).await;
    let app = dbmcp::transport::http::app(router);

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/mcp")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "POST, OPTIONS"
    );
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type"
    );
}

#[tokio::test]
async fn wrong_method_returns_405_with_json_body() {
    let router = common::router(true).await;
    let app = dbmcp::transport::http::app(router);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/mcp")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("Method not allowed. Use POST."));
}

#[tokio::test]
async fn parse_failure_returns_500_with_json_body() {
    let router = common::router(true).await;
    let app = dbmcp::transport::http::app(router);

    let response = app
        .oneshot(mcp_request("this is not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Internal server error"));
}

#[tokio::test]
async fn lifecycle_error_still_travels_as_200() {
    let router = common::router(true).await;
    let app = dbmcp::transport::http::app(router);

    let response = app
        .oneshot(mcp_request(r#"{"jsonrpc":"2.0","id":9,"method":"tools/list"}"#))
        .await
        .unwrap();

    // JSON-RPC errors are HTTP-level successes
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!(-32600));
}
