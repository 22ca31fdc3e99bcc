//! JSON-RPC 2.0 message handling for the MCP methods this server answers.
//!
//! Both HTTP transports feed raw JSON values into [`McpProtocol::handle_value`]
//! and write back whatever it returns. `None` means nothing needs sending,
//! which is the case for notifications and for responses sent by the client.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::dispatcher::Dispatcher;

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "cal-com-mcp-server";

/// Protocol revisions this server speaks, newest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Incoming JSON-RPC request or notification.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Optional parameters payload.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Response for a body that is not JSON at all
    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::failure(Value::Null, PARSE_ERROR, format!("Parse error: {}", detail))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": { "code": INTERNAL_ERROR, "message": "serialization failed" }
            })
        })
    }
}

/// Tool call parameters for `tools/call`.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Answers MCP requests against a [`Dispatcher`]
#[derive(Debug, Clone)]
pub struct McpProtocol {
    dispatcher: Dispatcher,
}

impl McpProtocol {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one message or a batch.
    ///
    /// Batches are answered with an array holding one entry per request;
    /// notifications inside a batch contribute nothing.
    pub async fn handle_value(&self, message: Value) -> Option<Value> {
        match message {
            Value::Array(batch) if batch.is_empty() => Some(
                JsonRpcResponse::failure(Value::Null, INVALID_REQUEST, "Invalid Request: empty batch")
                    .to_value(),
            ),
            Value::Array(batch) => {
                let responses: Vec<Value> = join_all(batch.into_iter().map(|m| self.handle_single(m)))
                    .await
                    .into_iter()
                    .flatten()
                    .map(|r| r.to_value())
                    .collect();
                if responses.is_empty() {
                    None
                } else {
                    Some(Value::Array(responses))
                }
            }
            single => self.handle_single(single).await.map(|r| r.to_value()),
        }
    }

    /// Handle raw bytes, answering unparseable input with a parse error
    pub async fn handle_bytes(&self, bytes: &[u8]) -> Option<Value> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(message) => self.handle_value(message).await,
            Err(e) => Some(JsonRpcResponse::parse_error(e).to_value()),
        }
    }

    async fn handle_single(&self, message: Value) -> Option<JsonRpcResponse> {
        if message.get("method").is_none()
            && (message.get("result").is_some() || message.get("error").is_some())
        {
            tracing::debug!("Ignoring client response message");
            return None;
        }

        let fallback_id = message.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    fallback_id,
                    INVALID_REQUEST,
                    format!("Invalid Request: {}", e),
                ))
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                request.id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            ));
        }

        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };

        Some(self.handle_request(id, &request.method, request.params).await)
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => tracing::debug!("Client initialized"),
            "notifications/cancelled" => tracing::debug!("Client cancelled a request"),
            other => tracing::debug!("Ignoring notification: {}", other),
        }
    }

    async fn handle_request(&self, id: Value, method: &str, params: Option<Value>) -> JsonRpcResponse {
        tracing::debug!("Handling request: {}", method);
        match method {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result(params.as_ref())),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.dispatcher.tools() })),
            "tools/call" => {
                let params = params.unwrap_or(Value::Null);
                let call = match serde_json::from_value::<ToolCallParams>(params) {
                    Ok(call) => call,
                    Err(e) => {
                        return JsonRpcResponse::failure(
                            id,
                            INVALID_PARAMS,
                            format!("Invalid params: {}", e),
                        )
                    }
                };
                tracing::info!("Calling tool: {}", call.name);
                let result = self.dispatcher.call(&call.name, call.arguments).await;
                match serde_json::to_value(&result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
                }
            }
            other => JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        }
    }

    fn initialize_result(&self, params: Option<&Value>) -> Value {
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        let version = match requested {
            Some(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v) => v,
            _ => SUPPORTED_PROTOCOL_VERSIONS[0],
        };

        json!({
            "protocolVersion": version,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }
}
