//! Qdrant sidecar - main entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use qdrant_sidecar::{
    cli::{Cli, Command, run_info_command, run_sidecar, run_status_command, run_stop_command},
    config::Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load .env before resolving configuration
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("qdrant_sidecar=info"));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let config = Config::from_env()?;
            run_sidecar(&config).await
        }
        Command::Info => {
            let config = Config::from_env()?;
            run_info_command(&config)
        }
        Command::Status => run_status_command().await,
        Command::Stop => run_stop_command().await,
    }
}
