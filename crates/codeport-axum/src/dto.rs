//! JSON bodies returned by the management API.

use std::collections::BTreeMap;

use codeport_core::{ToolDescriptor, TransportKind};
use serde::Serialize;
use serde_json::Value;

/// A tool as listed under its server.
#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<ToolDescriptor> for ToolInfo {
    fn from(tool: ToolDescriptor) -> Self {
        Self {
            name: tool.name,
            description: tool.description,
            input_schema: tool.input_schema,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub connected: bool,
    pub transport: TransportKind,
    pub tools: Vec<ToolInfo>,
}

#[derive(Debug, Serialize)]
pub struct ServersResponse {
    pub servers: BTreeMap<String, ServerInfo>,
    pub total_tools: usize,
}

/// A tool in the flat listing, tagged with its server.
#[derive(Debug, Serialize)]
pub struct ServerToolInfo {
    pub server: String,
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<ToolDescriptor> for ServerToolInfo {
    fn from(tool: ToolDescriptor) -> Self {
        Self {
            server: tool.server_name,
            name: tool.name,
            description: tool.description,
            input_schema: tool.input_schema,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ServerToolInfo>,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub status: &'static str,
    pub server: String,
    pub transport: TransportKind,
    pub tools: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub status: &'static str,
    pub server: String,
}

#[derive(Debug, Serialize)]
pub struct ToolCallResponse {
    pub tool: String,
    /// Raw content items from the server.
    pub result: Vec<Value>,
    pub is_error: bool,
}
