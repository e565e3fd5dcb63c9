//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No HTTP client or process types in any signature
//! - Errors are domain errors; adapters translate their own failures
//! - The agent loop and transform driver depend only on these traits

pub mod generation;
pub mod tools;

pub use generation::{GenerationError, TextGenerator};
pub use tools::{ToolCatalog, ToolExecError, ToolExecutor, ToolHost};
