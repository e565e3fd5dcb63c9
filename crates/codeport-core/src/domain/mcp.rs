//! MCP server and tool domain types.
//!
//! A `ServerDescriptor` names one MCP server and how to reach it. Tools
//! discovered on a live connection are described by `ToolDescriptor`;
//! invocations parsed out of model output are `ToolCall`s, and their
//! outcomes are `ToolResult`s.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Argument mapping passed to a tool.
pub type ToolArguments = serde_json::Map<String, Value>;

/// Transport used to reach an MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Child process speaking line-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// Long-lived HTTP event stream with a separate POST endpoint
    Sse,
    /// Request/response HTTP with session affinity
    StreamableHttp,
}

impl TransportKind {
    /// Wire name of the transport (`stdio`, `sse`, `streamable-http`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable-http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-specific connection parameters.
///
/// Tagged by `transport` so it round-trips through the management API:
/// `{"transport": "stdio", "command": "npx", "args": [...]}` or
/// `{"transport": "sse", "url": "http://..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "kebab-case")]
pub enum TransportConfig {
    /// Launch a child process.
    Stdio {
        /// Executable name or path
        command: String,
        /// Arguments passed to the executable
        #[serde(default)]
        args: Vec<String>,
        /// Environment overrides layered over the inherited environment
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    /// Connect to a legacy HTTP+SSE server.
    Sse {
        /// Event stream URL
        url: String,
        /// Extra request headers
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    /// Connect to a streamable HTTP server.
    StreamableHttp {
        /// Endpoint URL
        url: String,
        /// Extra request headers
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

impl TransportConfig {
    /// Create a stdio configuration.
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self::Stdio {
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    /// Create an SSE configuration.
    pub fn sse(url: impl Into<String>) -> Self {
        Self::Sse {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Create a streamable HTTP configuration.
    pub fn streamable_http(url: impl Into<String>) -> Self {
        Self::StreamableHttp {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// The transport kind of this configuration.
    pub const fn kind(&self) -> TransportKind {
        match self {
            Self::Stdio { .. } => TransportKind::Stdio,
            Self::Sse { .. } => TransportKind::Sse,
            Self::StreamableHttp { .. } => TransportKind::StreamableHttp,
        }
    }

    /// Validate the configuration for its transport kind.
    ///
    /// Stdio requires a non-empty command with no embedded whitespace
    /// (flags belong in `args`). HTTP kinds require an absolute
    /// `http`/`https` URL.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Stdio { command, .. } => {
                if command.trim().is_empty() {
                    return Err("Stdio server command cannot be empty".to_string());
                }
                if command.contains(char::is_whitespace) {
                    return Err(format!(
                        "Command must be an executable name/path only (got '{command}'). \
                         Put flags and arguments in 'args'."
                    ));
                }
                Ok(())
            }
            Self::Sse { url, .. } | Self::StreamableHttp { url, .. } => {
                let parsed = url::Url::parse(url)
                    .map_err(|e| format!("{} server url '{url}' is invalid: {e}", self.kind()))?;
                match parsed.scheme() {
                    "http" | "https" => Ok(()),
                    other => Err(format!(
                        "{} server url must be http or https, got '{other}'",
                        self.kind()
                    )),
                }
            }
        }
    }
}

/// Identifies one MCP server: a unique name plus how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    /// Unique server name (registry key).
    pub name: String,

    /// Transport and its parameters.
    #[serde(flatten)]
    pub transport: TransportConfig,
}

impl ServerDescriptor {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }

    /// The transport kind.
    pub const fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Validate the descriptor (name and transport parameters).
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Server name cannot be empty".to_string());
        }
        self.transport.validate()
    }
}

/// One parameter row of a tool's input schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolParameter {
    pub name: String,
    pub type_name: String,
    pub required: bool,
    pub description: String,
}

/// Tool metadata discovered from an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Name of the server that owns this tool.
    pub server_name: String,

    /// Tool name (dispatch key).
    pub name: String,

    /// Human-readable description (empty when the server gave none).
    #[serde(default)]
    pub description: String,

    /// JSON Schema for input parameters.
    #[serde(default)]
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Create a tool descriptor with no description or schema.
    pub fn new(server_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            name: name.into(),
            description: String::new(),
            input_schema: Value::Null,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Set the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Parameter rows read from `input_schema.properties`.
    ///
    /// Missing `type` renders as `any`; `required` is read from the
    /// schema's top-level `required` array.
    pub fn parameters(&self) -> Vec<ToolParameter> {
        let Some(props) = self
            .input_schema
            .get("properties")
            .and_then(Value::as_object)
        else {
            return Vec::new();
        };

        let required: Vec<&str> = self
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        props
            .iter()
            .map(|(name, info)| ToolParameter {
                name: name.clone(),
                type_name: info
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("any")
                    .to_string(),
                required: required.contains(&name.as_str()),
                description: info
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect()
    }
}

/// A tool invocation parsed out of model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: ToolArguments,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome status of a tool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Result of executing a tool call.
///
/// `text` carries the flattened result on success and the error message
/// on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub text: String,
}

impl ToolResult {
    /// Create a success result.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            text: text.into(),
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            text: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_config_tagged_serialization() {
        let config = TransportConfig::stdio("npx", vec!["-y".to_string()]);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["transport"], "stdio");
        assert_eq!(json["command"], "npx");

        let parsed: TransportConfig =
            serde_json::from_value(json!({"transport": "streamable-http", "url": "http://x/mcp"}))
                .unwrap();
        assert_eq!(parsed.kind(), TransportKind::StreamableHttp);
    }

    #[test]
    fn test_descriptor_flattens_transport() {
        let descriptor: ServerDescriptor = serde_json::from_value(json!({
            "name": "rag",
            "transport": "sse",
            "url": "http://localhost:3001/sse",
            "headers": {"Authorization": "Bearer x"}
        }))
        .unwrap();

        assert_eq!(descriptor.name, "rag");
        assert_eq!(descriptor.kind(), TransportKind::Sse);
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(TransportConfig::stdio("", vec![]).validate().is_err());
        assert!(TransportConfig::stdio("npx -y", vec![]).validate().is_err());
        assert!(TransportConfig::sse("not a url").validate().is_err());
        assert!(
            TransportConfig::streamable_http("ftp://example.com/mcp")
                .validate()
                .is_err()
        );
        assert!(
            TransportConfig::streamable_http("https://example.com/mcp")
                .validate()
                .is_ok()
        );
        assert!(
            ServerDescriptor::new("  ", TransportConfig::stdio("node", vec![]))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_tool_parameters_from_schema() {
        let tool = ToolDescriptor::new("rag", "query").with_input_schema(json!({
            "type": "object",
            "properties": {
                "question": {"type": "string", "description": "What to ask"},
                "top_k": {}
            },
            "required": ["question"]
        }));

        let params = tool.parameters();
        assert_eq!(params.len(), 2);

        let question = params.iter().find(|p| p.name == "question").unwrap();
        assert!(question.required);
        assert_eq!(question.type_name, "string");
        assert_eq!(question.description, "What to ask");

        let top_k = params.iter().find(|p| p.name == "top_k").unwrap();
        assert!(!top_k.required);
        assert_eq!(top_k.type_name, "any");
    }

    #[test]
    fn test_tool_parameters_without_schema() {
        assert!(ToolDescriptor::new("s", "t").parameters().is_empty());
    }

    #[test]
    fn test_tool_result() {
        let ok = ToolResult::success("42");
        assert!(ok.is_success());

        let err = ToolResult::error("Connection failed");
        assert!(!err.is_success());
        assert_eq!(err.text, "Connection failed");
        assert_eq!(
            serde_json::to_value(&err).unwrap()["status"],
            serde_json::json!("error")
        );
    }
}
