//! The MCP request router.
//!
//! Every decoded message enters through [`McpRouter::handle`]: lifecycle
//! check, method dispatch, service call, envelope. Requests (messages
//! with an `id` key) always produce a response; notifications never do,
//! whatever happens inside.

use crate::config::ServerConfig;
use crate::constants::{PROTOCOL_VERSION, SERVER_NAME};
use crate::database::service::{URI_SCHEMA_PREFIX, URI_TABLE_PREFIX};
use crate::database::DatabaseService;
use crate::error::ServerError;
use crate::messages;
use crate::protocol::lifecycle::{Lifecycle, ServerState};
use crate::protocol::rpc;
use crate::protocol::tools;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The MCP protocol router. Safe for concurrent use from multiple
/// transport workers; cheap to clone.
#[derive(Clone)]
pub struct McpRouter {
    service: Arc<DatabaseService>,
    config: Arc<ServerConfig>,
    lifecycle: Arc<Lifecycle>,
}

impl McpRouter {
    pub fn new(service: Arc<DatabaseService>, config: Arc<ServerConfig>) -> Self {
        Self {
            service,
            config,
            lifecycle: Arc::new(Lifecycle::new()),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServerState {
        self.lifecycle.state()
    }

    /// The database service, for transport-level probes.
    pub fn service(&self) -> &DatabaseService {
        &self.service
    }

    /// Transition to SHUTDOWN and close the pool. Idempotent.
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown();
        self.service.shutdown().await;
    }

    /// Route one decoded JSON-RPC message.
    ///
    /// Returns `Some(response)` for requests and `None` for notifications
    /// (including notifications that failed; those are only logged).
    pub async fn handle(&self, message: Value) -> Option<Value> {
        let Some(object) = message.as_object() else {
            warn!("discarding non-object JSON-RPC frame");
            return None;
        };

        // Presence of the `id` key marks a request, even when it is null.
        let id = object.get("id").cloned();
        let is_request = id.is_some();
        let id = id.unwrap_or(Value::Null);

        let Some(method) = object.get("method").and_then(Value::as_str) else {
            if is_request {
                return Some(rpc::error_response(
                    Some(&id),
                    crate::error::INVALID_REQUEST,
                    "Missing method",
                ));
            }
            warn!("notification without method discarded");
            return None;
        };

        debug!(method, request = is_request, "routing message");

        if let Err(err) = self.lifecycle.permits(method) {
            if is_request {
                return Some(rpc::error_response(Some(&id), err.rpc_code(), &err.to_string()));
            }
            warn!(method, error = %err, "notification rejected by lifecycle");
            return None;
        }

        let params = object
            .get("params")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let outcome = self.dispatch(method, &params).await;

        if !is_request {
            if let Err(err) = outcome {
                warn!(method, error = %err, "notification handling failed");
            }
            return None;
        }

        match outcome {
            Ok(result) => Some(rpc::success_response(&id, result)),
            Err(err) => {
                if err.rpc_code() == crate::error::INTERNAL_ERROR {
                    error!(method, error = %err, "request failed unexpectedly");
                } else {
                    debug!(method, error = %err, "request rejected");
                }
                Some(rpc::error_response(Some(&id), err.rpc_code(), &err.to_string()))
            }
        }
    }

    async fn dispatch(
        &self,
        method: &str,
        params: &Map<String, Value>,
    ) -> Result<Value, ServerError> {
        match method {
            "initialize" => self.handle_initialize(params),
            "notifications/initialized" => {
                self.lifecycle.complete_initialize()?;
                debug!("client reported initialized");
                Ok(Value::Null)
            }
            "tools/list" => Ok(json!({ "tools": tools::tool_definitions(&self.config) })),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => self.handle_resources_list().await,
            "resources/read" => self.handle_resources_read(params).await,
            "ping" => Ok(json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "state": self.lifecycle.state().name(),
            })),
            other => Err(ServerError::method_not_found(messages::error_message(
                "unknownMethod",
                &[other],
            ))),
        }
    }

    fn handle_initialize(&self, params: &Map<String, Value>) -> Result<Value, ServerError> {
        let client_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if client_version != PROTOCOL_VERSION {
            return Err(ServerError::lifecycle(messages::error_message(
                "versionMismatch",
                &[client_version, PROTOCOL_VERSION],
            )));
        }

        self.lifecycle.begin_initialize()?;

        if let Some(capabilities) = params.get("capabilities") {
            debug!(capabilities = %capabilities, "client capabilities recorded");
            self.lifecycle.set_client_capabilities(capabilities.clone());
        }

        let select_only = self.config.select_only;
        Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false },
                "security": tools::security_extension(&self.config),
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
                "description": "MCP server exposing a relational database as tools and resources",
                "summary": format!(
                    "2 tools, {} database, select-only: {select_only}",
                    self.service.database_type().name(),
                ),
            },
        }))
    }

    async fn handle_tools_call(&self, params: &Map<String, Value>) -> Result<Value, ServerError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ServerError::invalid_params("Missing tool name"))?;

        let arguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        tools::call_tool(&self.service, &self.config, name, &arguments).await
    }

    async fn handle_resources_list(&self) -> Result<Value, ServerError> {
        let resources = self.service.list_resources().await?;
        let listed: Vec<Value> = resources
            .iter()
            .map(|r| {
                json!({
                    "uri": r.uri,
                    "name": r.name,
                    "description": r.description,
                    "mimeType": r.mime_type,
                })
            })
            .collect();
        Ok(json!({ "resources": listed }))
    }

    async fn handle_resources_read(&self, params: &Map<String, Value>) -> Result<Value, ServerError> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| ServerError::invalid_params("Missing resource uri"))?;

        let resource = self
            .service
            .read_resource(uri)
            .await?
            .ok_or_else(|| {
                ServerError::resource_not_found(messages::error_message(
                    "resourceNotFound",
                    &[uri],
                ))
            })?;

        let mut text = resource.content.unwrap_or_default();

        // Table and schema metadata is user-controlled; bracket it so the
        // client model treats it as data.
        if uri.starts_with(URI_TABLE_PREFIX) {
            text = wrap_untrusted(&text, "table");
        } else if uri.starts_with(URI_SCHEMA_PREFIX) {
            text = wrap_untrusted(&text, "schema");
        }

        Ok(json!({
            "contents": [
                {
                    "uri": resource.uri,
                    "mimeType": resource.mime_type,
                    "text": text,
                }
            ]
        }))
    }
}

fn wrap_untrusted(text: &str, kind: &str) -> String {
    format!(
        "{}\n{}\n{}",
        messages::security_warning("untrustedHeader", &[kind]),
        text,
        messages::security_warning("untrustedFooter", &[]),
    )
}
