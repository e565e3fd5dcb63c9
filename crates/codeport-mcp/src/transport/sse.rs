//! Legacy HTTP+SSE transport.
//!
//! A long-lived `GET` event stream carries responses; its first `endpoint`
//! event names the URL that requests are `POST`ed to.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, HeaderMap};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use url::Url;

use super::pending::PendingRequests;
use super::{Transport, header_map, with_deadline};
use crate::error::McpError;
use crate::protocol::{Incoming, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::sse::{SseDecoder, SseEvent};

/// Transport over an SSE stream plus a POST endpoint.
pub struct SseTransport {
    server: String,
    client: reqwest::Client,
    endpoint: Url,
    headers: HeaderMap,
    pending: Arc<PendingRequests>,
    closed: CancellationToken,
}

impl SseTransport {
    /// Open the event stream and wait for the `endpoint` event.
    ///
    /// `deadline` covers both the stream request and endpoint discovery.
    pub async fn connect(
        server: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
        deadline: Duration,
    ) -> Result<Self, McpError> {
        let stream_url = Url::parse(url)
            .map_err(|e| McpError::InvalidConfig(format!("Invalid SSE url '{url}': {e}")))?;
        let headers = header_map(headers)?;
        let client = reqwest::Client::new();

        let discovery = async {
            let response = client
                .get(stream_url.clone())
                .headers(headers.clone())
                .header(ACCEPT, "text/event-stream")
                .send()
                .await?
                .error_for_status()?;

            let mut stream = Box::pin(response.bytes_stream());
            let mut decoder = SseDecoder::new();
            let (endpoint, backlog) =
                wait_for_endpoint(&mut stream, &mut decoder, &stream_url).await?;
            Ok::<_, McpError>((stream, decoder, endpoint, backlog))
        };
        let (mut stream, mut decoder, endpoint, backlog) =
            with_deadline("endpoint", deadline, discovery).await?;

        tracing::debug!(server_name = %server, endpoint = %endpoint, "SSE endpoint discovered");

        let pending = Arc::new(PendingRequests::new(server));
        let closed = CancellationToken::new();

        let reader_pending = Arc::clone(&pending);
        let reader_closed = closed.clone();
        let reader_server = server.to_string();
        tokio::spawn(async move {
            for event in backlog {
                route_event(&reader_server, &reader_pending, event).await;
            }
            loop {
                let chunk = tokio::select! {
                    () = reader_closed.cancelled() => break,
                    chunk = stream.next() => chunk,
                };
                match chunk {
                    Some(Ok(bytes)) => {
                        for event in decoder.feed(&bytes) {
                            route_event(&reader_server, &reader_pending, event).await;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(server_name = %reader_server, error = %e, "SSE stream error");
                        break;
                    }
                    None => {
                        tracing::debug!(server_name = %reader_server, "SSE stream ended");
                        break;
                    }
                }
            }
            reader_closed.cancel();
            reader_pending.fail_all().await;
        });

        Ok(Self {
            server: server.to_string(),
            client,
            endpoint,
            headers,
            pending,
            closed,
        })
    }

    async fn post<T: serde::Serialize + Sync>(&self, message: &T) -> Result<(), McpError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .json(message)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!(
                "POST to {} returned HTTP {status}: {body}",
                self.endpoint
            )));
        }
        Ok(())
    }
}

/// Consume events until `endpoint` arrives; events decoded after it in the
/// same chunk are returned for the reader to route.
async fn wait_for_endpoint<S>(
    stream: &mut S,
    decoder: &mut SseDecoder,
    base: &Url,
) -> Result<(Url, Vec<SseEvent>), McpError>
where
    S: Stream<Item = reqwest::Result<bytes::Bytes>> + Unpin,
{
    while let Some(chunk) = stream.next().await {
        let mut events = decoder.feed(&chunk?);
        if let Some(idx) = events.iter().position(|e| e.event == "endpoint") {
            let backlog = events.split_off(idx + 1);
            let data = events[idx].data.trim();
            let endpoint = base
                .join(data)
                .map_err(|e| McpError::Protocol(format!("Invalid endpoint '{data}': {e}")))?;
            return Ok((endpoint, backlog));
        }
    }
    Err(McpError::Protocol(
        "SSE stream ended before the endpoint event".to_string(),
    ))
}

async fn route_event(server: &str, pending: &PendingRequests, event: SseEvent) {
    if event.event != "message" {
        tracing::debug!(server_name = %server, event = %event.event, "Ignoring SSE event");
        return;
    }
    match Incoming::parse(&event.data) {
        Some(Incoming::Response(response)) => {
            pending.resolve(response).await;
        }
        Some(Incoming::ServerMessage { method }) => {
            tracing::debug!(server_name = %server, method = %method, "Ignoring server-initiated message");
        }
        None => {
            tracing::debug!(server_name = %server, data = %event.data, "Skipping non-JSON-RPC event");
        }
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        // Stops the reader task
        self.closed.cancel();
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn request(
        &self,
        request: JsonRpcRequest,
        deadline: Duration,
    ) -> Result<JsonRpcResponse, McpError> {
        if self.closed.is_cancelled() {
            return Err(McpError::ChannelClosed(self.server.clone()));
        }

        let rx = self.pending.register(request.id).await;
        if let Err(e) = self.post(&request).await {
            self.pending.cancel(request.id).await;
            return Err(e);
        }
        self.pending
            .wait(request.id, rx, &request.method, deadline)
            .await
    }

    async fn notify(
        &self,
        notification: JsonRpcNotification,
        deadline: Duration,
    ) -> Result<(), McpError> {
        with_deadline(&notification.method, deadline, self.post(&notification)).await
    }

    async fn close(&self) {
        self.closed.cancel();
        self.pending.fail_all().await;
    }

    fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }
}
