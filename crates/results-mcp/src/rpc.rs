//! JSON-RPC 2.0 dispatch for the MCP protocol.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::tools::Tools;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "tekton-results-mcp";

const PARSE_ERROR: i32 = -32700;
const INVALID_PARAMS: i32 = -32602;
const METHOD_NOT_FOUND: i32 = -32601;

/// JSON-RPC request structure
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    #[serde(default)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC response structure
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// MCP server state
#[derive(Clone)]
pub struct McpServer {
    tools: Tools,
}

impl McpServer {
    pub fn new(tools: Tools) -> Self {
        Self { tools }
    }

    /// Handle one serialized message. Returns the serialized reply, if any.
    pub async fn handle_message(&self, message: &str, cancel: &CancellationToken) -> Option<String> {
        let response = match serde_json::from_str::<JsonRpcRequest>(message) {
            Ok(request) => self.handle_request(&request, cancel).await?,
            Err(e) => {
                warn!(error = %e, "Invalid JSON-RPC message");
                JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))
            }
        };
        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "Failed to serialize response");
                None
            }
        }
    }

    /// Dispatch a request. Notifications get no response.
    pub async fn handle_request(&self, request: &JsonRpcRequest, cancel: &CancellationToken) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "JSON-RPC request");

        if request.method.starts_with("notifications/") {
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {
                        "tools": {}
                    },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.tools.definitions()),
            "tools/call" => self.handle_tool_call(id, request.params.as_ref(), cancel).await,
            _ => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, "Method not found"),
        };
        Some(response)
    }

    async fn handle_tool_call(&self, id: Value, params: Option<&Value>, cancel: &CancellationToken) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params");
        };

        let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let result = match self.tools.call(tool_name, &arguments, cancel).await {
            Ok(content) => json!({
                "content": [{
                    "type": "text",
                    "text": content
                }]
            }),
            Err(message) => json!({
                "content": [{
                    "type": "text",
                    "text": message
                }],
                "isError": true
            }),
        };
        JsonRpcResponse::success(id, result)
    }
}
