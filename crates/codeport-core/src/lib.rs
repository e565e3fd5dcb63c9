#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod env;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    GenerationOptions, GenerationRequest, ServerDescriptor, ToolArguments, ToolCall,
    ToolDescriptor, ToolParameter, ToolResult, ToolStatus, TransportConfig, TransportKind,
};
pub use env::{EnvProvider, MockEnv, SystemEnv};
pub use ports::{
    GenerationError, TextGenerator, ToolCatalog, ToolExecError, ToolExecutor, ToolHost,
};
pub use settings::{AppSettings, SettingsError};

#[cfg(test)]
use tokio as _;
