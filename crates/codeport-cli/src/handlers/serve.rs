//! Serve command handler.

use anyhow::Result;
use codeport_axum::{AxumContext, CorsConfig, start_configured_servers, start_server};

use crate::bootstrap::CliContext;

/// Run the HTTP API until interrupted.
pub async fn execute(mut ctx: CliContext, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        ctx.settings.host = host;
    }
    if let Some(port) = port {
        ctx.settings.port = port;
    }

    let generator = ctx.generator()?;
    let mcp = ctx.mcp_manager();
    start_configured_servers(&mcp, &ctx.settings, ctx.env.as_ref()).await?;

    let app = AxumContext::new(ctx.settings, mcp, generator);
    start_server(app, &CorsConfig::AllowAll).await
}
