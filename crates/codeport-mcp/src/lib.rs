#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod error;
pub(crate) mod manager;
pub mod protocol;
pub mod registry;
pub(crate) mod session;
pub mod sse;
pub mod transport;

pub use config::{ConfigError, load_server_config, parse_server_config};
pub use error::McpError;
pub use manager::{ConnectedServer, ConnectionState, ConnectionTask, McpManager};
pub use protocol::CallToolResult;
pub use registry::{NO_TOOLS_AVAILABLE, format_tools_for_prompt};
pub use session::{McpSession, McpTimeouts};

#[cfg(test)]
use axum as _;
