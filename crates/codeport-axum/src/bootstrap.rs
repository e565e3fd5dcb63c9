//! Axum server bootstrap - the composition root.
//!
//! This module is the only place where infrastructure is wired together
//! for the web adapter. All concrete implementations are instantiated here.

use std::sync::Arc;

use anyhow::{Context, Result};
use codeport_core::{AppSettings, EnvProvider, TextGenerator};
use codeport_llm::{OllamaClient, OllamaConfig};
use codeport_mcp::{McpManager, McpTimeouts, load_server_config};
use futures_util::future::join_all;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins.
    #[default]
    AllowAll,
    /// Allow specific origins.
    AllowOrigins(Vec<String>),
}

/// Application context for the Axum adapter.
pub struct AxumContext {
    pub settings: AppSettings,
    /// Live MCP connections, shared with every refactor job.
    pub mcp: McpManager,
    /// Inference backend.
    pub generator: Arc<dyn TextGenerator>,
}

impl AxumContext {
    pub fn new(settings: AppSettings, mcp: McpManager, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            settings,
            mcp,
            generator,
        }
    }
}

/// Build the generation client and MCP manager, and start every
/// configured server.
///
/// Servers that fail or are still connecting after `connect_wait` are
/// logged and left out; they never fail the bootstrap.
pub async fn bootstrap(settings: AppSettings, env: &dyn EnvProvider) -> Result<AxumContext> {
    let ollama = OllamaConfig::new(&settings.ollama_url, &settings.model_name)
        .with_timeout(settings.generation_timeout);
    let generator = OllamaClient::new(ollama).context("Failed to build generation client")?;

    info!(
        ollama_url = %generator.endpoint(),
        model = %generator.model(),
        mcp_config = %settings.mcp_config_path.display(),
        "Axum bootstrap resolved settings"
    );

    let mcp = McpManager::new(McpTimeouts {
        handshake: settings.handshake_timeout,
        tool_call: settings.tool_timeout,
    });
    start_configured_servers(&mcp, &settings, env).await?;

    Ok(AxumContext::new(settings, mcp, Arc::new(generator)))
}

/// Start every server in the MCP config file and wait for them to settle.
pub async fn start_configured_servers(
    mcp: &McpManager,
    settings: &AppSettings,
    env: &dyn EnvProvider,
) -> Result<()> {
    let servers = load_server_config(&settings.mcp_config_path, env)
        .context("Failed to load MCP server config")?;

    let mut tasks = Vec::with_capacity(servers.len());
    for descriptor in servers {
        let name = descriptor.name.clone();
        match mcp.start(descriptor).await {
            Ok(task) => tasks.push(task),
            Err(e) => warn!(server_name = %name, error = %e, "Failed to start MCP server"),
        }
    }

    let wait = settings.connect_wait;
    let ready = join_all(tasks.iter().map(|task| task.ready(wait))).await;
    for (task, ok) in tasks.iter().zip(ready) {
        if ok {
            info!(server_name = %task.name(), "MCP server ready");
        } else {
            warn!(server_name = %task.name(), state = %task.state(), "MCP server not ready");
        }
    }

    info!(
        connected = mcp.list_connected().await.len(),
        tools = mcp.list_all().await.len(),
        "MCP startup complete"
    );
    Ok(())
}

/// Serve until ctrl-c, then disconnect every MCP server.
pub async fn start_server(ctx: AxumContext, cors: &CorsConfig) -> Result<()> {
    let addr = ctx.settings.bind_addr();
    let mcp = ctx.mcp.clone();
    let app = crate::routes::create_router(ctx, cors);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("codeport API listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Shutting down, disconnecting MCP servers");
    mcp.disconnect_all().await;
    served.context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
