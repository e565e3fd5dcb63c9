//! Tools command handler.

use anyhow::Result;
use codeport_axum::start_configured_servers;
use codeport_core::ToolCatalog;

use crate::bootstrap::CliContext;

/// Connect every configured server, print the catalog, disconnect.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let mcp = ctx.mcp_manager();
    let started = start_configured_servers(&mcp, &ctx.settings, ctx.env.as_ref()).await;

    if started.is_ok() {
        let connected = mcp.list_connected().await;
        println!("Connected servers: {}", connected.len());
        for name in &connected {
            println!("  {name}");
        }
        println!();
        println!("{}", mcp.format_for_prompt().await);
    }

    mcp.disconnect_all().await;
    started
}
