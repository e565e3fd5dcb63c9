//! JSON-RPC 2.0 and MCP message types.
//!
//! Reference: <https://spec.modelcontextprotocol.io/>

use codeport_core::{ToolArguments, ToolDescriptor, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::McpError;

/// JSON-RPC protocol version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version sent in `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Client name reported to servers.
pub const CLIENT_NAME: &str = "codeport";

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 notification (no `id`).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params: json!({}),
        }
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Numeric request id this response answers, if any.
    pub fn request_id(&self) -> Option<u64> {
        self.id.as_u64()
    }

    /// Extract the result, converting a JSON-RPC error into `McpError::Server`.
    pub fn into_result(self) -> Result<Value, McpError> {
        if let Some(err) = self.error {
            return Err(McpError::Server {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| McpError::Protocol("Missing result in response".to_string()))
    }
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A message received from a server.
#[derive(Debug)]
pub enum Incoming {
    /// Response to one of our requests.
    Response(JsonRpcResponse),
    /// Server-initiated notification or request, identified by method.
    ServerMessage { method: String },
}

impl Incoming {
    /// Classify one JSON message. Returns `None` for anything that is not a
    /// JSON object.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        if let Some(method) = value.get("method").and_then(Value::as_str) {
            return Some(Self::ServerMessage {
                method: method.to_string(),
            });
        }
        serde_json::from_value(value).ok().map(Self::Response)
    }
}

/// MCP initialize result.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion", default)]
    pub protocol_version: String,
    #[serde(rename = "serverInfo", default)]
    pub server_info: ServerInfo,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
}

/// Server information from initialize.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Server capabilities.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: Option<Value>,
}

/// Parameters for `initialize`.
pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "capabilities": {}
    })
}

/// One page of `tools/list`.
#[derive(Debug, Deserialize)]
pub struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<ToolSchema>,
    #[serde(rename = "nextCursor", default)]
    pub next_cursor: Option<String>,
}

/// MCP tool from tools/list.
#[derive(Debug, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Option<Value>,
}

impl ToolSchema {
    pub fn into_descriptor(self, server_name: &str) -> ToolDescriptor {
        ToolDescriptor::new(server_name, self.name)
            .with_description(self.description.unwrap_or_default())
            .with_input_schema(self.input_schema.unwrap_or(Value::Null))
    }
}

/// Parameters for `tools/call`.
pub fn call_tool_params(name: &str, arguments: &ToolArguments) -> Value {
    json!({
        "name": name,
        "arguments": arguments
    })
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Content items (`{"type": "text", "text": ...}`, images, resources).
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Flatten content items into one string.
    ///
    /// Text items contribute their `text`; any other item contributes its
    /// compact JSON. Items are joined with `\n`.
    pub fn flatten_text(&self) -> String {
        self.content
            .iter()
            .map(|item| match item.get("text").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Convert into a domain result; `isError` becomes an error result.
    pub fn into_tool_result(self) -> ToolResult {
        let text = self.flatten_text();
        if self.is_error {
            ToolResult::error(text)
        } else {
            ToolResult::success(text)
        }
    }
}
