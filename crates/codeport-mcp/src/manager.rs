//! MCP connection lifecycle management.
//!
//! `McpManager` owns every live connection. Persistent connections run as
//! background tasks that establish the session, register its tools, then
//! hold it until cancelled or until the channel dies; cleanup (registry
//! removal, transport close) runs on both paths before the task finishes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use codeport_core::{
    ServerDescriptor, ToolArguments, ToolCatalog, ToolDescriptor, ToolExecError, ToolExecutor,
    ToolResult, TransportKind,
};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::McpError;
use crate::protocol::CallToolResult;
use crate::registry::{Registration, ToolRegistry, format_tools_for_prompt};
use crate::session::{McpSession, McpTimeouts};

/// Lifecycle state of one named connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Disconnecting,
    /// Last establishment attempt failed, or the channel closed unexpectedly.
    Failed(String),
}

impl ConnectionState {
    /// Whether a task or session currently owns the name.
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Disconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconnected => f.write_str("unconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Disconnecting => f.write_str("disconnecting"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Handle to a connection started with [`McpManager::start`].
#[derive(Debug, Clone)]
pub struct ConnectionTask {
    name: String,
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionTask {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state of the connection.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Wait up to `within` for establishment to settle.
    ///
    /// Returns true only if the connection became `Connected`.
    pub async fn ready(&self, within: Duration) -> bool {
        let mut state = self.state.clone();
        let settled = tokio::time::timeout(
            within,
            state.wait_for(|s| !matches!(s, ConnectionState::Connecting)),
        )
        .await;

        match settled {
            Ok(Ok(current)) => matches!(*current, ConnectionState::Connected),
            _ => false,
        }
    }
}

/// A connected server and its tools.
#[derive(Debug, Clone)]
pub struct ConnectedServer {
    pub name: String,
    pub transport: TransportKind,
    pub tools: Vec<ToolDescriptor>,
}

/// Bookkeeping for a name claimed by `connect` or `start`.
struct Tracked {
    cancel: CancellationToken,
    state: Arc<watch::Sender<ConnectionState>>,
    /// Task holding the connection; `None` while a one-shot `connect` is
    /// still handshaking.
    task: Option<JoinHandle<Result<(), McpError>>>,
}

struct Claim {
    cancel: CancellationToken,
    state: Arc<watch::Sender<ConnectionState>>,
    receiver: watch::Receiver<ConnectionState>,
}

struct Inner {
    registry: RwLock<ToolRegistry<Arc<McpSession>>>,
    tracked: Mutex<HashMap<String, Tracked>>,
    timeouts: McpTimeouts,
}

impl Inner {
    async fn register(
        &self,
        descriptor: &ServerDescriptor,
        tools: Vec<ToolDescriptor>,
        session: Arc<McpSession>,
    ) -> Result<(), McpError> {
        self.registry
            .write()
            .await
            .insert(Registration {
                name: descriptor.name.clone(),
                kind: descriptor.kind(),
                tools,
                handle: session,
            })
            .map_err(|rejected| McpError::AlreadyConnected(rejected.name))
    }

    /// Remove `name` only if it is still bound to `session`.
    async fn unregister(&self, name: &str, session: &Arc<McpSession>) {
        self.registry
            .write()
            .await
            .remove_if(name, |handle| Arc::ptr_eq(handle, session));
    }
}

/// Manager for MCP connection lifecycle.
///
/// Cheap to clone; clones share the same connections. Call
/// [`disconnect_all`](Self::disconnect_all) before shutdown so stdio
/// servers are terminated gracefully rather than killed on drop.
#[derive(Clone)]
pub struct McpManager {
    inner: Arc<Inner>,
}

impl McpManager {
    /// Create a manager with no connections.
    pub fn new(timeouts: McpTimeouts) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: RwLock::new(ToolRegistry::new()),
                tracked: Mutex::new(HashMap::new()),
                timeouts,
            }),
        }
    }

    pub fn timeouts(&self) -> McpTimeouts {
        self.inner.timeouts
    }

    /// Atomically claim `name` for a new connection.
    async fn claim(&self, name: &str) -> Result<Claim, McpError> {
        let mut tracked = self.inner.tracked.lock().await;

        let live = tracked
            .get(name)
            .is_some_and(|t| t.state.borrow().is_live());
        if live || self.inner.registry.read().await.contains(name) {
            return Err(McpError::AlreadyConnected(name.to_string()));
        }

        let cancel = CancellationToken::new();
        let (tx, receiver) = watch::channel(ConnectionState::Connecting);
        let state = Arc::new(tx);
        tracked.insert(
            name.to_string(),
            Tracked {
                cancel: cancel.clone(),
                state: Arc::clone(&state),
                task: None,
            },
        );
        drop(tracked);

        Ok(Claim {
            cancel,
            state,
            receiver,
        })
    }

    /// Connect and wait for the handshake, returning the discovered tools.
    ///
    /// The connection stays registered until [`disconnect`](Self::disconnect)
    /// or until the server goes away.
    pub async fn connect(
        &self,
        descriptor: &ServerDescriptor,
    ) -> Result<Vec<ToolDescriptor>, McpError> {
        descriptor.validate().map_err(McpError::InvalidConfig)?;
        let name = descriptor.name.as_str();
        let claim = self.claim(name).await?;

        let established = tokio::select! {
            () = claim.cancel.cancelled() => Err(McpError::NotConnected(name.to_string())),
            result = McpSession::establish(descriptor, self.inner.timeouts) => result,
        };

        let outcome = match established {
            Ok((session, tools)) if !claim.cancel.is_cancelled() => {
                let session = Arc::new(session);
                match self
                    .inner
                    .register(descriptor, tools.clone(), Arc::clone(&session))
                    .await
                {
                    Ok(()) => {
                        claim.state.send_replace(ConnectionState::Connected);
                        self.watch(name, session, &claim).await;
                        Ok(tools)
                    }
                    Err(e) => {
                        session.close().await;
                        Err(e)
                    }
                }
            }
            Ok((session, _)) => {
                // Disconnected while the handshake was in flight
                session.close().await;
                Err(McpError::NotConnected(name.to_string()))
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            tracing::warn!(server_name = %name, error = %e, "Failed to connect to MCP server");
            claim.state.send_replace(ConnectionState::Failed(e.to_string()));
        }
        outcome
    }

    /// Hold a session registered by `connect` until it is cancelled or dies.
    async fn watch(&self, name: &str, session: Arc<McpSession>, claim: &Claim) {
        let task = tokio::spawn(hold_session(
            Arc::clone(&self.inner),
            name.to_string(),
            session,
            claim.cancel.clone(),
            Arc::clone(&claim.state),
        ));
        self.attach(name, &claim.state, task).await;
    }

    /// Record `task` for `name` unless the claim has been released meanwhile.
    async fn attach(
        &self,
        name: &str,
        state: &Arc<watch::Sender<ConnectionState>>,
        task: JoinHandle<Result<(), McpError>>,
    ) {
        if let Some(tracked) = self.inner.tracked.lock().await.get_mut(name) {
            if Arc::ptr_eq(&tracked.state, state) {
                tracked.task = Some(task);
            }
        }
    }

    /// Start a background task that connects and holds the connection.
    ///
    /// Returns as soon as the task is spawned; use
    /// [`ConnectionTask::ready`] to wait for establishment.
    pub async fn start(&self, descriptor: ServerDescriptor) -> Result<ConnectionTask, McpError> {
        descriptor.validate().map_err(McpError::InvalidConfig)?;
        let name = descriptor.name.clone();
        let claim = self.claim(&name).await?;

        let task = tokio::spawn(hold_connection(
            Arc::clone(&self.inner),
            descriptor,
            claim.cancel.clone(),
            Arc::clone(&claim.state),
        ));

        self.attach(&name, &claim.state, task).await;

        Ok(ConnectionTask {
            name,
            state: claim.receiver,
        })
    }

    /// Disconnect `name`, waiting for its cleanup to finish.
    ///
    /// Returns false if nothing was connected or connecting under that name.
    pub async fn disconnect(&self, name: &str) -> bool {
        let tracked = self.inner.tracked.lock().await.remove(name);

        let mut was_live = false;
        let mut had_task = false;
        if let Some(tracked) = tracked {
            was_live = tracked.state.borrow().is_live();
            if was_live {
                tracked.state.send_replace(ConnectionState::Disconnecting);
            }
            tracked.cancel.cancel();

            if let Some(task) = tracked.task {
                had_task = true;
                match task.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(server_name = %name, error = %e, "Connection task ended with error");
                    }
                    Err(e) => {
                        tracing::warn!(server_name = %name, error = %e, "Connection task panicked");
                    }
                }
            }
            tracked.state.send_replace(ConnectionState::Unconnected);
        }

        // A session whose task was never attached is closed here
        let mut closed_session = false;
        if !had_task {
            let removed = self.inner.registry.write().await.remove(name);
            if let Some(registration) = removed {
                registration.handle.close().await;
                closed_session = true;
            }
        }

        let disconnected = was_live || closed_session;
        if disconnected {
            tracing::info!(server_name = %name, "Disconnected from MCP server");
        } else {
            tracing::debug!(server_name = %name, "Disconnect requested for unknown server");
        }
        disconnected
    }

    /// Disconnect every tracked or registered connection.
    pub async fn disconnect_all(&self) {
        let mut names: Vec<String> = self.inner.tracked.lock().await.keys().cloned().collect();
        for name in self.inner.registry.read().await.names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        for name in names {
            self.disconnect(&name).await;
        }
    }

    /// Whether `name` has an established, registered connection.
    pub async fn is_connected(&self, name: &str) -> bool {
        self.inner.registry.read().await.contains(name)
    }

    /// Names of connected servers in registration order.
    pub async fn list_connected(&self) -> Vec<String> {
        self.inner.registry.read().await.names()
    }

    /// Current lifecycle state of `name`.
    pub async fn state(&self, name: &str) -> ConnectionState {
        if let Some(tracked) = self.inner.tracked.lock().await.get(name) {
            return tracked.state.borrow().clone();
        }
        if self.is_connected(name).await {
            ConnectionState::Connected
        } else {
            ConnectionState::Unconnected
        }
    }

    /// Connected servers with their tools.
    pub async fn connected_servers(&self) -> Vec<ConnectedServer> {
        self.inner
            .registry
            .read()
            .await
            .iter()
            .map(|r| ConnectedServer {
                name: r.name.clone(),
                transport: r.kind,
                tools: r.tools.clone(),
            })
            .collect()
    }

    /// Every tool across all connections.
    pub async fn list_all(&self) -> Vec<ToolDescriptor> {
        self.inner.registry.read().await.list_all()
    }

    /// Tools of one server; empty when it is not connected.
    pub async fn tools_for(&self, server: &str) -> Vec<ToolDescriptor> {
        self.inner.registry.read().await.tools_for(server)
    }

    /// Server that dispatch by name would use for `tool_name`.
    pub async fn find_owner(&self, tool_name: &str) -> Option<String> {
        self.inner
            .registry
            .read()
            .await
            .find_owner(tool_name)
            .map(|r| r.name.clone())
    }

    /// Call a tool on a specific server.
    pub async fn call(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: &ToolArguments,
    ) -> Result<CallToolResult, McpError> {
        let session = self
            .inner
            .registry
            .read()
            .await
            .get(server_name)
            .map(|r| Arc::clone(&r.handle))
            .ok_or_else(|| McpError::NotConnected(server_name.to_string()))?;

        tracing::debug!(server_name = %server_name, tool = %tool_name, "Calling MCP tool");
        session.call_tool(tool_name, arguments).await
    }

    /// Call a tool by name on whichever server owns it.
    pub async fn call_by_name(
        &self,
        tool_name: &str,
        arguments: &ToolArguments,
    ) -> Result<CallToolResult, McpError> {
        let (server_name, session) = self
            .inner
            .registry
            .read()
            .await
            .find_owner(tool_name)
            .map(|r| (r.name.clone(), Arc::clone(&r.handle)))
            .ok_or_else(|| McpError::ToolNotFound(tool_name.to_string()))?;

        tracing::debug!(server_name = %server_name, tool = %tool_name, "Calling MCP tool");
        session.call_tool(tool_name, arguments).await
    }
}

impl Default for McpManager {
    fn default() -> Self {
        Self::new(McpTimeouts::default())
    }
}

/// Body of a persistent connection's background task.
async fn hold_connection(
    inner: Arc<Inner>,
    descriptor: ServerDescriptor,
    cancel: CancellationToken,
    state: Arc<watch::Sender<ConnectionState>>,
) -> Result<(), McpError> {
    let name = descriptor.name.clone();

    let established = tokio::select! {
        () = cancel.cancelled() => {
            state.send_replace(ConnectionState::Unconnected);
            return Ok(());
        }
        result = McpSession::establish(&descriptor, inner.timeouts) => result,
    };

    let (session, tools) = match established {
        Ok(established) => established,
        Err(e) => {
            tracing::warn!(server_name = %name, error = %e, "Failed to connect to MCP server");
            state.send_replace(ConnectionState::Failed(e.to_string()));
            return Err(e);
        }
    };

    let session = Arc::new(session);
    if let Err(e) = inner.register(&descriptor, tools, Arc::clone(&session)).await {
        session.close().await;
        state.send_replace(ConnectionState::Failed(e.to_string()));
        return Err(e);
    }
    state.send_replace(ConnectionState::Connected);

    hold_session(inner, name, session, cancel, state).await
}

/// Hold a registered session until cancelled or until its channel closes,
/// then unregister and close it.
async fn hold_session(
    inner: Arc<Inner>,
    name: String,
    session: Arc<McpSession>,
    cancel: CancellationToken,
    state: Arc<watch::Sender<ConnectionState>>,
) -> Result<(), McpError> {
    let outcome = tokio::select! {
        () = cancel.cancelled() => Ok(()),
        () = session.closed() => Err(McpError::ChannelClosed(name.clone())),
    };

    inner.unregister(&name, &session).await;
    session.close().await;

    match &outcome {
        Ok(()) => {
            state.send_replace(ConnectionState::Unconnected);
        }
        Err(_) => {
            tracing::warn!(server_name = %name, "MCP server connection closed unexpectedly");
            state.send_replace(ConnectionState::Failed("channel closed".to_string()));
        }
    }
    outcome
}

#[async_trait]
impl ToolExecutor for McpManager {
    async fn execute(
        &self,
        tool_name: &str,
        arguments: &ToolArguments,
    ) -> Result<ToolResult, ToolExecError> {
        match self.call_by_name(tool_name, arguments).await {
            Ok(result) => {
                let result = result.into_tool_result();
                if result.is_success() {
                    tracing::info!(tool = %tool_name, "Tool executed successfully");
                } else {
                    tracing::warn!(tool = %tool_name, error = %result.text, "Tool reported an error");
                }
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(tool = %tool_name, error = %e, "Tool call failed");
                Err(e.into_tool_error(tool_name))
            }
        }
    }
}

#[async_trait]
impl ToolCatalog for McpManager {
    async fn tools(&self) -> Vec<ToolDescriptor> {
        self.list_all().await
    }

    async fn format_for_prompt(&self) -> String {
        format_tools_for_prompt(&self.list_all().await)
    }
}
