//! Host lifecycle hooks for container-backed extensions.
//!
//! The host drives every extension through the same three calls:
//! `on_extension_load` → `on_platform_start` → `on_platform_shutdown`.
//! Consumers query [`Extension::connection_info`] in between.

pub mod connection;
pub mod qdrant;

pub use connection::{ConnectionInfo, Protocol};
pub use qdrant::QdrantExtension;

use async_trait::async_trait;

use crate::sidecar::{Result, SidecarManager};

/// An extension the host platform can load, start and shut down.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Logical extension name.
    fn name(&self) -> &str;

    /// Called once when the host loads the extension. Logging only.
    fn on_extension_load(&self);

    /// Called when the host platform starts. Failures make this extension
    /// unavailable; they are not fatal to the host.
    async fn on_platform_start(&self) -> Result<()>;

    /// Called when the host platform shuts down. Never fails.
    async fn on_platform_shutdown(&self);

    /// Endpoint description for consumers.
    fn connection_info(&self) -> ConnectionInfo;
}

/// Hook plumbing shared by every extension that runs one sidecar container.
#[derive(Debug)]
pub struct ContainerExtension {
    manager: SidecarManager,
}

impl ContainerExtension {
    pub fn new(manager: SidecarManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &SidecarManager {
        &self.manager
    }

    pub fn into_manager(self) -> SidecarManager {
        self.manager
    }

    pub fn name(&self) -> &str {
        self.manager.name()
    }

    pub fn load(&self) {
        tracing::info!("Loading {} extension", self.name());
    }

    pub async fn start(&self) -> Result<()> {
        tracing::info!(
            "Starting {} extension - launching container",
            self.name()
        );
        self.manager.start().await
    }

    pub async fn shutdown(&self) {
        tracing::info!("Shutting down {} extension", self.name());
        self.manager.stop().await;
    }
}
