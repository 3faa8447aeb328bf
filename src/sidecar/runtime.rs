//! Container runtime abstraction.
//!
//! The manager only needs three operations from a runtime: run a detached
//! container, force-remove it, and ask whether it exists. [`DockerRuntime`]
//! implements them against the Docker daemon; tests use
//! [`StubRuntime`](crate::testing::StubRuntime).
//!
//! [`DockerRuntime`]: crate::sidecar::docker::DockerRuntime

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::sidecar::config::{LaunchSpec, Mount};

/// Errors reported by a container runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// No container with this name exists.
    #[error("container '{name}' not found")]
    NotFound { name: String },

    /// The runtime itself could not be reached.
    #[error("container runtime unavailable: {reason}")]
    Unavailable { reason: String },

    /// The runtime refused the request (bad image, port in use, ...).
    #[error("{reason}")]
    Rejected { reason: String },
}

/// What a force-remove found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// A container was removed.
    Removed,
    /// Nothing to remove (never created, or already gone).
    Absent,
}

/// Parameters of a detached run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Unique container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Ports published one-to-one (container port = host port).
    pub ports: Vec<u16>,
    /// Command override.
    pub command: Option<Vec<String>>,
    /// Container environment.
    pub env: BTreeMap<String, String>,
    /// Bind mounts.
    pub mounts: Vec<Mount>,
    /// Remove the container when it exits.
    pub auto_remove: bool,
}

impl RunRequest {
    /// Build the run request for `spec` under the container name `name`.
    pub fn from_spec(name: impl Into<String>, spec: &LaunchSpec) -> Self {
        Self {
            name: name.into(),
            image: spec.image().to_string(),
            ports: spec.ports().to_vec(),
            command: spec.command().map(<[String]>::to_vec),
            env: spec.env().clone(),
            mounts: spec.mounts().to_vec(),
            auto_remove: true,
        }
    }
}

/// A container runtime shared by every manager in the process.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Run a detached container. Returns the container id.
    ///
    /// On error no container may be left behind under `request.name`.
    async fn run(&self, request: &RunRequest) -> Result<String, RuntimeError>;

    /// Force-remove a container by name. An absent container is not an error.
    async fn remove(&self, name: &str) -> Result<Removal, RuntimeError>;

    /// Whether a container with this name currently exists.
    async fn exists(&self, name: &str) -> Result<bool, RuntimeError>;
}
