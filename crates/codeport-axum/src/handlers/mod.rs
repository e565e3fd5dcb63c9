//! HTTP request handlers.
//!
//! Handlers are thin wrappers over `McpManager` and `FileTransformer`.

pub mod mcp;
pub mod refactor;
