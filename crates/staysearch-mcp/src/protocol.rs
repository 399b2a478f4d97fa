//! JSON-RPC 2.0 envelopes and the MCP payloads the client uses.
//!
//! Only the client half of the protocol is modelled: `initialize`,
//! `notifications/initialized`, `tools/list` and `tools/call`, plus answering
//! server-initiated `ping` requests.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{McpError, Result};

/// The MCP protocol version this client speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const CLIENT_NAME: &str = "staysearch";
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

// Standard JSON-RPC error codes.
pub const METHOD_NOT_FOUND: i32 = -32601;

// ---------------------------------------------------------------------------
// JSON-RPC envelopes
// ---------------------------------------------------------------------------

/// An outgoing request.  The client always uses numeric ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: i64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: i64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// An outgoing notification (no id, no response).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A response, either to us or from us (when answering a server `ping`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Numeric id of the request this answers, if it has one.
    pub fn numeric_id(&self) -> Option<i64> {
        self.id.as_i64()
    }

    /// Turn the response into the `result` value or an [`McpError::Server`].
    pub fn into_result(self) -> Result<Value> {
        match (self.result, self.error) {
            (_, Some(err)) => Err(McpError::Server {
                code: err.code,
                message: err.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// Anything a server may send us.
#[derive(Debug, Clone)]
pub enum Incoming {
    Response(JsonRpcResponse),
    /// A server-initiated request that expects an answer.
    Request { id: Value, method: String },
    Notification { method: String, params: Value },
}

/// Classify a raw JSON-RPC message.
pub fn classify(value: Value) -> Result<Incoming> {
    let method = value.get("method").and_then(Value::as_str).map(str::to_owned);
    match (method, value.get("id").filter(|id| !id.is_null()).cloned()) {
        (Some(method), Some(id)) => Ok(Incoming::Request { id, method }),
        (Some(method), None) => Ok(Incoming::Notification {
            method,
            params: value.get("params").cloned().unwrap_or(Value::Null),
        }),
        (None, _) => serde_json::from_value(value)
            .map(Incoming::Response)
            .map_err(|e| McpError::Protocol {
                reason: format!("not a JSON-RPC response: {e}"),
            }),
    }
}

/// The answer we give to a server-initiated request.
pub fn answer_server_request(id: Value, method: &str) -> JsonRpcResponse {
    if method == "ping" {
        JsonRpcResponse::success(id, json!({}))
    } else {
        JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("client does not handle `{method}`"))
    }
}

// ---------------------------------------------------------------------------
// MCP payloads
// ---------------------------------------------------------------------------

/// Parameters for `initialize`.
pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": CLIENT_VERSION,
        }
    })
}

/// The subset of the `initialize` result we keep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// A tool advertised by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// One page of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<McpToolDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// The result of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<McpContent>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

/// A content block inside a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpContent {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "mimeType", default)]
        mime_type: String,
    },
    Resource {
        resource: Value,
    },
    #[serde(other)]
    Unsupported,
}

impl CallToolResult {
    /// Flatten the content blocks into text for the model.
    pub fn to_text(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                McpContent::Text { text } => text.clone(),
                McpContent::Image { mime_type } => format!("[image: {mime_type}]"),
                McpContent::Resource { resource } => resource
                    .get("text")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| resource.to_string()),
                McpContent::Unsupported => "[unsupported content]".to_owned(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
