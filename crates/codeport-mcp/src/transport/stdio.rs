//! Child-process transport: line-delimited JSON-RPC over stdin/stdout.

use std::collections::BTreeMap;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

use super::pending::PendingRequests;
use super::{Transport, with_deadline};
use crate::error::McpError;
use crate::protocol::{Incoming, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// How long a server gets to exit on its own after stdin closes.
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// How long a server gets to exit after SIGTERM before SIGKILL.
#[cfg(unix)]
const TERM_GRACE: Duration = Duration::from_secs(3);

/// Transport over a spawned MCP server process.
pub struct StdioTransport {
    server: String,
    writer: Mutex<Option<BufWriter<ChildStdin>>>,
    child: Mutex<Option<Child>>,
    pending: Arc<PendingRequests>,
    closed: CancellationToken,
}

impl StdioTransport {
    /// Spawn `command args…` with `env` layered over the inherited environment.
    ///
    /// The child is killed if this transport is dropped without `close`.
    pub fn spawn(
        server: &str,
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<Self, McpError> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::Spawn(format!("Failed to spawn '{command}': {e}\nArgs: {args:?}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Spawn("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Spawn("Failed to get stdout".to_string()))?;

        let pending = Arc::new(PendingRequests::new(server));
        let closed = CancellationToken::new();

        spawn_reader_loop(
            server.to_string(),
            stdout,
            Arc::clone(&pending),
            closed.clone(),
        );
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_forwarder(server.to_string(), stderr);
        }

        tracing::debug!(server_name = %server, command = %command, "Spawned stdio MCP server");

        Ok(Self {
            server: server.to_string(),
            writer: Mutex::new(Some(BufWriter::new(stdin))),
            child: Mutex::new(Some(child)),
            pending,
            closed,
        })
    }

    async fn write_line<T: Serialize + Sync>(&self, message: &T) -> Result<(), McpError> {
        let line = serde_json::to_string(message)?;
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| McpError::ChannelClosed(self.server.clone()))?;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn request(
        &self,
        request: JsonRpcRequest,
        deadline: Duration,
    ) -> Result<JsonRpcResponse, McpError> {
        if self.closed.is_cancelled() {
            return Err(McpError::ChannelClosed(self.server.clone()));
        }

        let rx = self.pending.register(request.id).await;
        if let Err(e) = self.write_line(&request).await {
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
        with_deadline(&notification.method, deadline, self.write_line(&notification)).await
    }

    async fn close(&self) {
        // Dropping stdin signals EOF
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }

        let child = self.child.lock().await.take();
        if let Some(child) = child {
            match terminate(child).await {
                Ok(status) => {
                    tracing::debug!(server_name = %self.server, %status, "MCP server process exited");
                }
                Err(e) => {
                    tracing::warn!(server_name = %self.server, error = %e, "Failed to reap MCP server process");
                }
            }
        }

        self.closed.cancel();
        self.pending.fail_all().await;
    }

    fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        // Stops the reader task; the child itself is killed on drop
        self.closed.cancel();
    }
}

/// Read stdout lines and route responses until EOF or close.
fn spawn_reader_loop(
    server: String,
    stdout: ChildStdout,
    pending: Arc<PendingRequests>,
    closed: CancellationToken,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();

        loop {
            let next = tokio::select! {
                () = closed.cancelled() => break,
                line = lines.next_line() => line,
            };

            match next {
                Ok(Some(line)) => route_line(&server, &pending, &line).await,
                Ok(None) => {
                    tracing::debug!(server_name = %server, "MCP server closed stdout");
                    break;
                }
                Err(e) => {
                    tracing::warn!(server_name = %server, error = %e, "MCP server read error");
                    break;
                }
            }
        }

        closed.cancel();
        pending.fail_all().await;
    });
}

async fn route_line(server: &str, pending: &PendingRequests, line: &str) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }

    match Incoming::parse(trimmed) {
        Some(Incoming::Response(response)) => {
            if !pending.resolve(response).await {
                tracing::debug!(server_name = %server, "Dropping response with no waiting request");
            }
        }
        Some(Incoming::ServerMessage { method }) => {
            tracing::debug!(server_name = %server, method = %method, "Ignoring server-initiated message");
        }
        // Not valid JSON-RPC, might be npx output, skip it
        None => tracing::debug!(server_name = %server, line = trimmed, "Skipping non-JSON-RPC output"),
    }
}

fn spawn_stderr_forwarder(server: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(server_name = %server, line = %line, "MCP server stderr");
        }
    });
}

/// Wait briefly for a voluntary exit, then escalate.
async fn terminate(mut child: Child) -> io::Result<ExitStatus> {
    if let Ok(result) = timeout(EXIT_GRACE, child.wait()).await {
        return result;
    }
    shutdown_child(child).await
}

/// Shut down a child process with SIGTERM, escalating to SIGKILL if needed,
/// and reap it.
#[cfg(unix)]
async fn shutdown_child(mut child: Child) -> io::Result<ExitStatus> {
    let pid = child
        .id()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "child has no PID"))?;
    let pid = i32::try_from(pid).map_err(io::Error::other)?;

    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        // Process may have already exited
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(TERM_GRACE, child.wait()).await {
        return result;
    }

    child.kill().await?;
    child.wait().await
}

#[cfg(not(unix))]
async fn shutdown_child(mut child: Child) -> io::Result<ExitStatus> {
    child.kill().await?;
    child.wait().await
}
