//! Routing of responses to waiting requests by JSON-RPC id.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};

use crate::error::McpError;
use crate::protocol::JsonRpcResponse;

/// In-flight requests keyed by id.
pub(crate) struct PendingRequests {
    server: String,
    waiting: Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>,
}

impl PendingRequests {
    pub(crate) fn new(server: &str) -> Self {
        Self {
            server: server.to_string(),
            waiting: Mutex::new(HashMap::new()),
        }
    }

    /// Register interest in the response to `id`.
    pub(crate) async fn register(&self, id: u64) -> oneshot::Receiver<JsonRpcResponse> {
        let (tx, rx) = oneshot::channel();
        self.waiting.lock().await.insert(id, tx);
        rx
    }

    /// Hand a response to its waiter. Returns false for unknown ids.
    pub(crate) async fn resolve(&self, response: JsonRpcResponse) -> bool {
        let Some(id) = response.request_id() else {
            return false;
        };
        let Some(tx) = self.waiting.lock().await.remove(&id) else {
            return false;
        };
        tx.send(response).is_ok()
    }

    /// Forget a request whose send failed.
    pub(crate) async fn cancel(&self, id: u64) {
        self.waiting.lock().await.remove(&id);
    }

    /// Fail every waiter (their receivers observe a closed channel).
    pub(crate) async fn fail_all(&self) {
        self.waiting.lock().await.clear();
    }

    /// Wait up to `deadline` for the response to `id`.
    pub(crate) async fn wait(
        &self,
        id: u64,
        rx: oneshot::Receiver<JsonRpcResponse>,
        method: &str,
        deadline: Duration,
    ) -> Result<JsonRpcResponse, McpError> {
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(McpError::ChannelClosed(self.server.clone())),
            Err(_) => {
                self.cancel(id).await;
                Err(McpError::Timeout {
                    method: method.to_string(),
                    after: deadline,
                })
            }
        }
    }
}
