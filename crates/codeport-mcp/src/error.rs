//! Errors for MCP connection and manager operations.

use std::time::Duration;

use codeport_core::ToolExecError;
use thiserror::Error;

/// Errors that can occur while talking to MCP servers.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Tool '{0}' not found on any connected server")]
    ToolNotFound(String),

    #[error("Not connected to MCP server: {0}")]
    NotConnected(String),

    #[error("MCP server already connected: {0}")]
    AlreadyConnected(String),

    #[error("Failed to spawn MCP server process: {0}")]
    Spawn(String),

    #[error("Handshake with MCP server '{server}' failed: {message}")]
    Handshake { server: String, message: String },

    #[error("Timeout after {after:?} waiting for '{method}'")]
    Timeout { method: String, after: Duration },

    #[error("MCP server returned error: code={code}, message={message}")]
    Server { code: i64, message: String },

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("MCP transport error: {0}")]
    Transport(String),

    #[error("Invalid MCP server configuration: {0}")]
    InvalidConfig(String),

    #[error("Connection to MCP server '{0}' closed")]
    ChannelClosed(String),

    #[error("Failed to communicate with MCP server: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Wrap a failure during connection establishment.
    ///
    /// Spawn and configuration errors pass through unchanged; anything else
    /// becomes a `Handshake` error naming the server.
    pub(crate) fn during_handshake(self, server: &str) -> Self {
        match self {
            Self::Spawn(_) | Self::InvalidConfig(_) | Self::Handshake { .. } => self,
            other => Self::Handshake {
                server: server.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for McpError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl McpError {
    /// Translate into the tool port's error for a call to `tool`.
    pub(crate) fn into_tool_error(self, tool: &str) -> ToolExecError {
        match self {
            Self::ToolNotFound(name) => ToolExecError::NotFound(name),
            Self::Timeout { after, .. } => ToolExecError::Timeout {
                tool: tool.to_string(),
                after,
            },
            other => ToolExecError::Failed {
                tool: tool.to_string(),
                message: other.to_string(),
            },
        }
    }
}
