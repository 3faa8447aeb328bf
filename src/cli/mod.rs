//! CLI command handling.
//!
//! Provides subcommands for:
//! - Running the Qdrant sidecar until interrupted (`run`)
//! - Printing connection info without starting anything (`info`)
//! - Checking Docker and the sidecar container (`status`)
//! - Removing a leftover sidecar container (`stop`)

mod status;

pub use status::{run_status_command, run_stop_command};

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::extension::{Extension, QdrantExtension};
use crate::sidecar::{ContainerRuntime, DockerRuntime};

#[derive(Parser, Debug)]
#[command(name = "qdrant-sidecar")]
#[command(about = "Run Qdrant as a supervised sidecar container")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Read environment overrides from this file instead of ./.env
    #[arg(long, global = true, env = "SIDECAR_ENV_FILE")]
    pub env_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start the sidecar and keep it running until Ctrl-C (default)
    Run,

    /// Print connection info as JSON without starting the sidecar
    Info,

    /// Check Docker availability and whether the sidecar container exists
    Status,

    /// Force-remove the sidecar container if it exists
    Stop,
}

/// Load → start → print connection info → wait for a signal → shutdown.
pub async fn run_sidecar(config: &Config) -> anyhow::Result<()> {
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::connect().await?);
    let extension = QdrantExtension::new(&config.qdrant, &config.host, runtime)?;

    extension.on_extension_load();

    tokio::select! {
        started = extension.on_platform_start() => started?,
        _ = shutdown_signal() => {
            tracing::info!("Interrupted during startup");
            extension.on_platform_shutdown().await;
            return Ok(());
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&extension.connection_info())?
    );

    shutdown_signal().await;
    extension.on_platform_shutdown().await;
    Ok(())
}

/// Print the connection info the `run` command would report.
pub fn run_info_command(config: &Config) -> anyhow::Result<()> {
    let info = config.qdrant.connection_info(&config.host);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
