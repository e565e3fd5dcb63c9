//! Transports carrying JSON-RPC messages to one MCP server.
//!
//! Each transport moves already-built requests and hands back the matching
//! response. `open` is the single point mapping a `TransportConfig` variant
//! to its connection strategy.

mod http;
mod pending;
mod sse;
mod stdio;

use std::time::Duration;

use async_trait::async_trait;
use codeport_core::{ServerDescriptor, TransportConfig};
use tokio_util::sync::WaitForCancellationFuture;

use crate::error::McpError;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

pub use http::StreamableHttpTransport;
pub use sse::SseTransport;
pub use stdio::StdioTransport;

/// A bidirectional JSON-RPC channel to one MCP server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait up to `deadline` for its response.
    async fn request(
        &self,
        request: JsonRpcRequest,
        deadline: Duration,
    ) -> Result<JsonRpcResponse, McpError>;

    /// Send a notification (no response expected), giving up after `deadline`.
    async fn notify(
        &self,
        notification: JsonRpcNotification,
        deadline: Duration,
    ) -> Result<(), McpError>;

    /// Release the channel. Safe to call more than once.
    async fn close(&self);

    /// Resolves once the channel has closed, by `close` or by the server
    /// going away.
    fn closed(&self) -> WaitForCancellationFuture<'_>;
}

/// Open a transport for `descriptor`.
///
/// `deadline` bounds any connection-time exchange (the SSE stream request and
/// endpoint discovery) and the session teardown sent on close.
pub async fn open(
    descriptor: &ServerDescriptor,
    deadline: Duration,
) -> Result<Box<dyn Transport>, McpError> {
    let name = descriptor.name.as_str();
    match &descriptor.transport {
        TransportConfig::Stdio { command, args, env } => {
            Ok(Box::new(StdioTransport::spawn(name, command, args, env)?))
        }
        TransportConfig::Sse { url, headers } => Ok(Box::new(
            SseTransport::connect(name, url, headers, deadline).await?,
        )),
        TransportConfig::StreamableHttp { url, headers } => {
            Ok(Box::new(StreamableHttpTransport::new(
                name, url, headers, deadline,
            )?))
        }
    }
}

/// Run `fut`, failing with `Timeout` for `method` once `deadline` passes.
async fn with_deadline<T, F>(method: &str, deadline: Duration, fut: F) -> Result<T, McpError>
where
    F: Future<Output = Result<T, McpError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| McpError::Timeout {
            method: method.to_string(),
            after: deadline,
        })?
}

/// Build a header map from configured string pairs.
fn header_map(
    headers: &std::collections::BTreeMap<String, String>,
) -> Result<reqwest::header::HeaderMap, McpError> {
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| McpError::InvalidConfig(format!("Invalid header name '{key}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| McpError::InvalidConfig(format!("Invalid value for header '{key}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
