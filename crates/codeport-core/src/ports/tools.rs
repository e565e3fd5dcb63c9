//! Tool hosting ports.
//!
//! `ToolExecutor` dispatches a call by tool name; `ToolCatalog` answers
//! which tools exist. The MCP connection manager implements both.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ToolArguments, ToolDescriptor, ToolResult};

/// Errors from dispatching a tool call.
///
/// A tool that ran and reported failure is not an error here: it comes
/// back as `Ok(ToolResult::error(..))`.
#[derive(Debug, Error)]
pub enum ToolExecError {
    /// No connected server exposes a tool with this name.
    #[error("Tool '{0}' not found on any connected server")]
    NotFound(String),

    /// The call could not be carried out (transport or protocol failure).
    #[error("Tool '{tool}' failed: {message}")]
    Failed { tool: String, message: String },

    /// The call did not complete within its deadline.
    #[error("Tool '{tool}' timed out after {after:?}")]
    Timeout { tool: String, after: Duration },
}

impl ToolExecError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Executes tool calls by name.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        tool_name: &str,
        arguments: &ToolArguments,
    ) -> Result<ToolResult, ToolExecError>;
}

/// Lists available tools.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    /// Every tool across all live connections.
    async fn tools(&self) -> Vec<ToolDescriptor>;

    /// Render the catalog for inclusion in a system prompt.
    async fn format_for_prompt(&self) -> String;
}

/// Something that both lists and executes tools.
pub trait ToolHost: ToolCatalog + ToolExecutor {}

impl<T: ToolCatalog + ToolExecutor + ?Sized> ToolHost for T {}
