//! netwatch agent entry point.
//!
//! Binary name: `netwatch`
//!
//! Parses CLI arguments, loads configuration, sets up logging, wires the
//! publication pipeline, then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;

use cli::{Cli, Commands};
use netwatch_infra::config::load_agent_config;
use netwatch_observe::tracing_setup::{LogFormat, init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(format, cli.log_directive(), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let config = load_agent_config(&cli.config).await;
    let state = AppState::init(config).await?;

    let result = match &cli.command {
        Commands::Run { addresses } => cli::run::run(&state, addresses).await,
        Commands::Register { addresses } => {
            cli::register::register(&state, addresses, cli.json).await
        }
        Commands::Topology => cli::topology::topology(&state, cli.json).await,
    };

    shutdown_tracing();
    result
}
