#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod agent_loop;
pub mod error;
pub mod parser;
pub mod prompt;
pub mod resolve;

pub use agent_loop::{AgentConfig, AgentOutcome, DEFAULT_MAX_TURNS, execute_calls, run_agentic};
pub use error::AgentError;
pub use parser::{extract, has_tool_calls, substitute};
pub use prompt::{ToolCallRecord, format_tool_results, tool_call_instructions};
pub use resolve::resolve_in_place;

// Only referenced from the integration tests' fakes
#[cfg(test)]
use async_trait as _;
