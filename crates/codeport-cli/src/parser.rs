//! Root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Port and refactor source trees with a local model and MCP tools.
#[derive(Debug, Parser)]
#[command(name = "codeport")]
#[command(version)]
pub struct Cli {
    /// MCP server config file
    #[arg(long = "mcp-config", global = true, env = "MCP_CONFIG_PATH")]
    pub mcp_config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
