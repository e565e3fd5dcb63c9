//! CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use codeport_cli::handlers::refactor::RefactorArgs;
use codeport_cli::{Cli, Commands, bootstrap, handlers};

const CODEPORT_CRATES: &[&str] = &[
    "codeport_cli",
    "codeport_core",
    "codeport_mcp",
    "codeport_agent",
    "codeport_llm",
    "codeport_transform",
    "codeport_axum",
];

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CODEPORT_CRATES
            .iter()
            .map(|krate| format!("{krate}={level}"))
            .collect();
        EnvFilter::new(format!("warn,{}", directives.join(",")))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads env-backed flags
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = bootstrap(&cli)?;
    tracing::debug!(settings = ?ctx.settings, "Resolved settings");

    match cli.command {
        Commands::Serve { host, port } => handlers::serve::execute(ctx, host, port).await,
        Commands::Refactor {
            dir,
            instructions,
            agentic,
            max_in_flight,
        } => {
            let args = RefactorArgs {
                dir: &dir,
                instructions,
                agentic,
                max_in_flight,
            };
            handlers::refactor::execute(&ctx, args).await
        }
        Commands::Tools => handlers::tools::execute(&ctx).await,
    }
}
