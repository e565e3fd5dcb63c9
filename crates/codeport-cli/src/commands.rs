//! Subcommand definitions.

use std::path::PathBuf;

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Interface to bind (overrides APP_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides APP_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Transform every file under a directory in place
    Refactor {
        /// Project directory
        dir: PathBuf,
        /// What to do with each file
        #[arg(short, long)]
        instructions: String,
        /// Let the model call MCP tools before answering
        #[arg(long)]
        agentic: bool,
        /// Files processed at once (overrides CODEPORT_MAX_FILES_IN_FLIGHT)
        #[arg(long)]
        max_in_flight: Option<usize>,
    },

    /// Connect every configured MCP server and print the tool catalog
    Tools,
}
