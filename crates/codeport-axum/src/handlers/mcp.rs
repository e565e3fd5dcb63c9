//! MCP handlers - connection management and direct tool calls.

use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use codeport_core::{ServerDescriptor, ToolArguments, TransportConfig};
use codeport_mcp::ConnectionState;
use tracing::{info, warn};

use crate::dto::{
    ConnectResponse, DisconnectResponse, ServerInfo, ServerToolInfo, ServersResponse,
    ToolCallResponse, ToolsResponse,
};
use crate::error::HttpError;
use crate::state::AppState;

/// List connected servers and their tools.
pub async fn list_servers(State(state): State<AppState>) -> Json<ServersResponse> {
    let connected = state.mcp.connected_servers().await;
    let total_tools = connected.iter().map(|s| s.tools.len()).sum();

    let servers = connected
        .into_iter()
        .map(|server| {
            let info = ServerInfo {
                connected: true,
                transport: server.transport,
                tools: server.tools.into_iter().map(Into::into).collect(),
            };
            (server.name, info)
        })
        .collect();

    Json(ServersResponse {
        servers,
        total_tools,
    })
}

/// List every tool across connected servers.
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    let tools = state
        .mcp
        .list_all()
        .await
        .into_iter()
        .map(ServerToolInfo::from)
        .collect();
    Json(ToolsResponse { tools })
}

/// Connect a server and wait for its handshake.
pub async fn connect(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<TransportConfig>, JsonRejection>,
) -> Result<Json<ConnectResponse>, HttpError> {
    let Json(transport) = body.map_err(|e| HttpError::BadRequest(e.body_text()))?;
    let descriptor = ServerDescriptor::new(name.clone(), transport);
    descriptor.validate().map_err(HttpError::BadRequest)?;
    let kind = descriptor.kind();

    let task = state.mcp.start(descriptor).await?;
    let wait = state.settings.connect_wait;
    if !task.ready(wait).await {
        if let Err(e) = after_missed_wait(&name, task.state(), wait) {
            if matches!(e, HttpError::GatewayTimeout(_)) {
                // Still handshaking: give the name back rather than leave it half-claimed
                state.mcp.disconnect(&name).await;
            }
            return Err(e);
        }
    }

    let tools: Vec<String> = state
        .mcp
        .tools_for(&name)
        .await
        .into_iter()
        .map(|t| t.name)
        .collect();
    info!(server_name = %name, tool_count = tools.len(), "Connected MCP server via API");

    Ok(Json(ConnectResponse {
        status: "connected",
        server: name,
        transport: kind,
        tools,
    }))
}

/// Disconnect a server.
pub async fn disconnect(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DisconnectResponse>, HttpError> {
    if !state.mcp.disconnect(&name).await {
        return Err(HttpError::NotFound(format!(
            "Not connected to MCP server: {name}"
        )));
    }
    Ok(Json(DisconnectResponse {
        status: "disconnected",
        server: name,
    }))
}

/// Call a tool by name. An empty body means no arguments.
pub async fn call_tool(
    State(state): State<AppState>,
    Path(tool): Path<String>,
    body: Bytes,
) -> Result<Json<ToolCallResponse>, HttpError> {
    let arguments = parse_arguments(&body)?;
    let result = state.mcp.call_by_name(&tool, &arguments).await?;

    Ok(Json(ToolCallResponse {
        tool,
        result: result.content,
        is_error: result.is_error,
    }))
}

/// Outcome of a connect whose readiness wait ran out, judged by the state
/// read afterwards. The handshake may have finished in between.
fn after_missed_wait(
    name: &str,
    state: ConnectionState,
    wait: Duration,
) -> Result<(), HttpError> {
    match state {
        ConnectionState::Connected => Ok(()),
        ConnectionState::Failed(reason) => Err(HttpError::BadGateway(format!(
            "Failed to connect to MCP server '{name}': {reason}"
        ))),
        state_now => {
            warn!(server_name = %name, state = %state_now, "MCP server not ready in time");
            Err(HttpError::GatewayTimeout(format!(
                "MCP server '{name}' not ready within {}s",
                wait.as_secs()
            )))
        }
    }
}

fn parse_arguments(body: &[u8]) -> Result<ToolArguments, HttpError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ToolArguments::new());
    }
    serde_json::from_slice(body)
        .map_err(|e| HttpError::BadRequest(format!("Tool arguments must be a JSON object: {e}")))
}
