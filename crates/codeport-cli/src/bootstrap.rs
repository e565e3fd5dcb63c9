//! CLI composition root: settings resolution and shared services.

use std::sync::Arc;

use anyhow::{Context, Result};
use codeport_core::{AppSettings, EnvProvider, SystemEnv, TextGenerator};
use codeport_llm::{OllamaClient, OllamaConfig};
use codeport_mcp::{McpManager, McpTimeouts};

use crate::parser::Cli;

/// Everything a command handler needs.
pub struct CliContext {
    pub settings: AppSettings,
    pub env: Arc<dyn EnvProvider>,
}

impl CliContext {
    /// A generation client for the configured backend.
    pub fn generator(&self) -> Result<Arc<dyn TextGenerator>> {
        let config = OllamaConfig::new(&self.settings.ollama_url, &self.settings.model_name)
            .with_timeout(self.settings.generation_timeout);
        let client = OllamaClient::new(config).context("Failed to build generation client")?;
        Ok(Arc::new(client))
    }

    /// An MCP manager with the configured timeouts and no connections.
    pub fn mcp_manager(&self) -> McpManager {
        McpManager::new(McpTimeouts {
            handshake: self.settings.handshake_timeout,
            tool_call: self.settings.tool_timeout,
        })
    }
}

/// Resolve settings from the environment and global flags.
pub fn bootstrap(cli: &Cli) -> Result<CliContext> {
    let env: Arc<dyn EnvProvider> = Arc::new(SystemEnv);
    let mut settings =
        AppSettings::from_env(env.as_ref()).context("Invalid settings in environment")?;
    if let Some(path) = &cli.mcp_config {
        settings.mcp_config_path.clone_from(path);
    }
    Ok(CliContext { settings, env })
}
