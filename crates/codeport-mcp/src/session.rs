//! One initialized MCP session over any transport.
//!
//! `McpSession::establish` opens the transport, performs the `initialize`
//! handshake and discovers tools, all within the handshake deadline. Nothing
//! is returned on failure, and the transport is closed before the error
//! propagates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use codeport_core::{ServerDescriptor, ToolArguments, ToolDescriptor, TransportKind};
use serde_json::{Value, json};

use crate::error::McpError;
use crate::protocol::{
    CallToolResult, InitializeResult, JsonRpcNotification, JsonRpcRequest, MCP_PROTOCOL_VERSION,
    ServerInfo, ToolsListResult, call_tool_params, initialize_params,
};
use crate::transport::{self, Transport};

/// Guard against servers that hand out cursors forever.
const MAX_TOOL_PAGES: usize = 100;

/// Per-request deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McpTimeouts {
    /// Bound on connection setup, `initialize` and `tools/list`.
    pub handshake: Duration,
    /// Bound on each `tools/call`.
    pub tool_call: Duration,
}

impl Default for McpTimeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(30),
            tool_call: Duration::from_secs(120),
        }
    }
}

/// An initialized session with one MCP server.
pub struct McpSession {
    server_name: String,
    kind: TransportKind,
    transport: Box<dyn Transport>,
    next_id: AtomicU64,
    timeouts: McpTimeouts,
    server_info: ServerInfo,
}

impl McpSession {
    /// Connect to `descriptor`, perform the handshake and list its tools.
    ///
    /// The whole exchange shares one `timeouts.handshake` deadline. A transport
    /// abandoned by the deadline is dropped, which kills a stdio child.
    pub async fn establish(
        descriptor: &ServerDescriptor,
        timeouts: McpTimeouts,
    ) -> Result<(Self, Vec<ToolDescriptor>), McpError> {
        descriptor.validate().map_err(McpError::InvalidConfig)?;

        tokio::time::timeout(timeouts.handshake, Self::open_and_handshake(descriptor, timeouts))
            .await
            .map_err(|_| {
                McpError::Timeout {
                    method: "initialize".to_string(),
                    after: timeouts.handshake,
                }
                .during_handshake(&descriptor.name)
            })?
    }

    async fn open_and_handshake(
        descriptor: &ServerDescriptor,
        timeouts: McpTimeouts,
    ) -> Result<(Self, Vec<ToolDescriptor>), McpError> {
        let transport = transport::open(descriptor, timeouts.handshake)
            .await
            .map_err(|e| e.during_handshake(&descriptor.name))?;

        let mut session = Self {
            server_name: descriptor.name.clone(),
            kind: descriptor.kind(),
            transport,
            next_id: AtomicU64::new(1),
            timeouts,
            server_info: ServerInfo::default(),
        };

        match session.handshake().await {
            Ok(tools) => {
                tracing::info!(
                    server_name = %session.server_name,
                    transport = %session.kind,
                    tool_count = tools.len(),
                    "MCP server connected"
                );
                Ok((session, tools))
            }
            Err(e) => {
                session.transport.close().await;
                Err(e.during_handshake(&descriptor.name))
            }
        }
    }

    async fn handshake(&mut self) -> Result<Vec<ToolDescriptor>, McpError> {
        let result = self
            .request("initialize", Some(initialize_params()), self.timeouts.handshake)
            .await?;
        let init: InitializeResult = serde_json::from_value(result)?;

        if init.protocol_version != MCP_PROTOCOL_VERSION {
            tracing::debug!(
                server_name = %self.server_name,
                protocol_version = %init.protocol_version,
                "Server negotiated a different protocol version"
            );
        }

        self.transport
            .notify(
                JsonRpcNotification::new("notifications/initialized"),
                self.timeouts.handshake,
            )
            .await?;
        self.server_info = init.server_info;

        if init.capabilities.tools.is_none() {
            return Ok(Vec::new());
        }
        self.list_tools().await
    }

    /// Fetch every page of `tools/list`.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self
                .request("tools/list", params, self.timeouts.handshake)
                .await?;
            let page: ToolsListResult = serde_json::from_value(result)?;

            tools.extend(
                page.tools
                    .into_iter()
                    .map(|t| t.into_descriptor(&self.server_name)),
            );

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        Err(McpError::Protocol(format!(
            "tools/list did not finish after {MAX_TOOL_PAGES} pages"
        )))
    }

    /// Call a tool on this server.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &ToolArguments,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .request(
                "tools/call",
                Some(call_tool_params(name, arguments)),
                self.timeouts.tool_call,
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        deadline: Duration,
    ) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.transport
            .request(JsonRpcRequest::new(id, method, params), deadline)
            .await?
            .into_result()
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub const fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Server info reported by `initialize`.
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Close the underlying transport.
    pub async fn close(&self) {
        self.transport.close().await;
    }

    /// Resolves when the channel closes.
    pub async fn closed(&self) {
        self.transport.closed().await;
    }
}
