//! Streamable HTTP transport.
//!
//! Every message is a `POST` to one URL. A reply is either a JSON body or an
//! event stream carrying the response. The session id handed out on
//! `initialize` is echoed on every later request.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use tokio::sync::RwLock;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use url::Url;

use super::{Transport, header_map, with_deadline};
use crate::error::McpError;
use crate::protocol::{Incoming, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::sse::SseDecoder;

/// Session affinity header.
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Transport over request/response HTTP.
pub struct StreamableHttpTransport {
    server: String,
    client: reqwest::Client,
    url: Url,
    headers: HeaderMap,
    session_id: RwLock<Option<String>>,
    closed: CancellationToken,
    /// Bound on the session `DELETE` sent by `close`.
    close_deadline: Duration,
}

impl StreamableHttpTransport {
    pub fn new(
        server: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
        close_deadline: Duration,
    ) -> Result<Self, McpError> {
        let url = Url::parse(url)
            .map_err(|e| McpError::InvalidConfig(format!("Invalid url '{url}': {e}")))?;
        Ok(Self {
            server: server.to_string(),
            client: reqwest::Client::new(),
            url,
            headers: header_map(headers)?,
            session_id: RwLock::new(None),
            closed: CancellationToken::new(),
            close_deadline,
        })
    }

    async fn post<T: serde::Serialize + Sync>(
        &self,
        message: &T,
    ) -> Result<reqwest::Response, McpError> {
        if self.closed.is_cancelled() {
            return Err(McpError::ChannelClosed(self.server.clone()));
        }

        let mut builder = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(message);
        if let Some(session) = self.session_id.read().await.as_deref() {
            builder = builder.header(SESSION_HEADER, session);
        }

        let response = builder.send().await?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            let mut current = self.session_id.write().await;
            if current.as_deref() != Some(session) {
                tracing::debug!(server_name = %self.server, session_id = %session, "MCP session established");
                *current = Some(session.to_string());
            }
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!(
                "POST to {} returned HTTP {status}: {body}",
                self.url
            )));
        }
        Ok(response)
    }

    /// Read the response to `id` out of an HTTP reply.
    async fn read_reply(
        &self,
        response: reqwest::Response,
        id: u64,
    ) -> Result<JsonRpcResponse, McpError> {
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if !is_stream {
            let body = response.text().await?;
            return match Incoming::parse(&body) {
                Some(Incoming::Response(reply)) if reply.request_id() == Some(id) => Ok(reply),
                _ => Err(McpError::Protocol(format!(
                    "Unexpected reply to request {id}: {body}"
                ))),
            };
        }

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = stream.next().await {
            for event in decoder.feed(&chunk?) {
                match Incoming::parse(&event.data) {
                    Some(Incoming::Response(reply)) if reply.request_id() == Some(id) => {
                        return Ok(reply);
                    }
                    Some(Incoming::ServerMessage { method }) => {
                        tracing::debug!(server_name = %self.server, method = %method, "Ignoring server-initiated message");
                    }
                    _ => {}
                }
            }
        }
        Err(McpError::Protocol(format!(
            "Event stream ended before the reply to request {id}"
        )))
    }
}

#[async_trait]
impl Transport for StreamableHttpTransport {
    async fn request(
        &self,
        request: JsonRpcRequest,
        deadline: Duration,
    ) -> Result<JsonRpcResponse, McpError> {
        let exchange = async {
            let response = self.post(&request).await?;
            self.read_reply(response, request.id).await
        };
        with_deadline(&request.method, deadline, exchange).await
    }

    async fn notify(
        &self,
        notification: JsonRpcNotification,
        deadline: Duration,
    ) -> Result<(), McpError> {
        with_deadline(&notification.method, deadline, self.post(&notification))
            .await
            .map(drop)
    }

    async fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();

        let session = self.session_id.write().await.take();
        if let Some(session) = session {
            // Best effort: servers may not support explicit termination
            let delete = self
                .client
                .delete(self.url.clone())
                .headers(self.headers.clone())
                .header(SESSION_HEADER, &session)
                .send();
            match tokio::time::timeout(self.close_deadline, delete).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::debug!(server_name = %self.server, error = %e, "Session DELETE failed");
                }
                Err(_) => {
                    tracing::debug!(
                        server_name = %self.server,
                        after = ?self.close_deadline,
                        "Session DELETE timed out"
                    );
                }
            }
        }
    }

    fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }
}
