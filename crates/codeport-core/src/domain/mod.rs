//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (processes, HTTP, filesystem).
//!
//! # Structure
//!
//! - `mcp` - MCP server descriptors, tool descriptors, tool calls and results
//! - `generation` - LLM generation requests and options

pub mod generation;
pub mod mcp;

pub use generation::{GenerationOptions, GenerationRequest};
pub use mcp::{
    ServerDescriptor, ToolArguments, ToolCall, ToolDescriptor, ToolParameter, ToolResult,
    ToolStatus, TransportConfig, TransportKind,
};
