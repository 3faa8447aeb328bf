//! Docker implementation of [`ContainerRuntime`] on top of bollard.

use std::collections::HashMap;
#[cfg(unix)]
use std::path::PathBuf;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding};
use futures::StreamExt;

use crate::sidecar::error::{Result, SidecarError};
use crate::sidecar::runtime::{ContainerRuntime, Removal, RunRequest, RuntimeError};

/// Seconds bollard waits on a socket request before giving up.
const SOCKET_TIMEOUT_SECS: u64 = 120;

/// Connect to the Docker daemon and verify it answers a ping.
///
/// Tries bollard's local defaults (which honor `DOCKER_HOST`) first, then the
/// Docker Desktop socket under the home directory and the rootless socket
/// under `$XDG_RUNTIME_DIR`.
pub async fn connect_docker() -> Result<Docker> {
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut last_error = match Docker::connect_with_local_defaults() {
        Ok(docker) => match docker.ping().await {
            Ok(_) => return Ok(docker),
            Err(e) => e.to_string(),
        },
        Err(e) => e.to_string(),
    };

    #[cfg(unix)]
    for socket in fallback_sockets() {
        if !socket.exists() {
            continue;
        }
        let Some(path) = socket.to_str() else {
            continue;
        };
        match Docker::connect_with_unix(path, SOCKET_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        {
            Ok(docker) => match docker.ping().await {
                Ok(_) => {
                    tracing::debug!("Connected to Docker via {}", path);
                    return Ok(docker);
                }
                Err(e) => last_error = format!("{path}: {e}"),
            },
            Err(e) => last_error = format!("{path}: {e}"),
        }
    }

    Err(SidecarError::DockerNotAvailable { reason: last_error })
}

/// Socket paths worth trying when the default connection fails.
#[cfg(unix)]
fn fallback_sockets() -> Vec<PathBuf> {
    let mut sockets = Vec::new();
    if let Some(home) = dirs::home_dir() {
        sockets.push(home.join(".docker/run/docker.sock"));
    }
    if let Some(runtime_dir) = std::env::var_os("XDG_RUNTIME_DIR") {
        sockets.push(PathBuf::from(runtime_dir).join("docker.sock"));
    }
    sockets
}

/// Container runtime backed by a Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the local daemon.
    pub async fn connect() -> Result<Self> {
        Ok(Self::new(connect_docker().await?))
    }

    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Pull the image unless it is already present locally.
    async fn pull_image(&self, image: &str) -> std::result::Result<(), RuntimeError> {
        if self.docker.inspect_image(image).await.is_ok() {
            tracing::debug!("Image '{}' exists locally", image);
            return Ok(());
        }

        tracing::info!("Pulling image: {}", image);

        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };
        let mut stream = self.docker.create_image(Some(options), None, None);

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(status) = info.status {
                        tracing::trace!("Pull status: {}", status);
                    }
                }
                Err(e) => {
                    return Err(RuntimeError::Rejected {
                        reason: format!("failed to pull image '{image}': {e}"),
                    });
                }
            }
        }

        tracing::info!("Pulled image: {}", image);
        Ok(())
    }

    async fn create_container(
        &self,
        request: &RunRequest,
    ) -> std::result::Result<String, RuntimeError> {
        let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = request
            .ports
            .iter()
            .map(|port| {
                (
                    format!("{port}/tcp"),
                    Some(vec![PortBinding {
                        host_ip: None,
                        host_port: Some(port.to_string()),
                    }]),
                )
            })
            .collect();

        // bollard expects HashMap<String, HashMap<(), ()>>
        let exposed_ports: HashMap<String, HashMap<(), ()>> = request
            .ports
            .iter()
            .map(|port| (format!("{port}/tcp"), HashMap::new()))
            .collect();

        let env: Vec<String> = request
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let binds: Vec<String> = request.mounts.iter().map(ToString::to_string).collect();

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            binds: if binds.is_empty() { None } else { Some(binds) },
            auto_remove: Some(request.auto_remove),
            ..Default::default()
        };

        let config = Config {
            image: Some(request.image.clone()),
            cmd: request.command.clone(),
            env: if env.is_empty() { None } else { Some(env) },
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: request.name.clone(),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| classify(&request.name, e))?;

        for warning in &response.warnings {
            tracing::warn!("Docker warning for '{}': {}", request.name, warning);
        }

        Ok(response.id)
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn run(&self, request: &RunRequest) -> std::result::Result<String, RuntimeError> {
        self.pull_image(&request.image).await?;

        let id = self.create_container(request).await?;

        if let Err(e) = self
            .docker
            .start_container(&id, None::<StartContainerOptions<String>>)
            .await
        {
            // Created but never started: auto-remove will not fire.
            discard_unstarted(self, &request.name).await;
            return Err(classify(&request.name, e));
        }

        tracing::debug!("Started container {} ({})", request.name, id);
        Ok(id)
    }

    async fn remove(&self, name: &str) -> std::result::Result<Removal, RuntimeError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        match self.docker.remove_container(name, Some(options)).await {
            Ok(()) => Ok(Removal::Removed),
            Err(e) => match classify(name, e) {
                RuntimeError::NotFound { .. } => Ok(Removal::Absent),
                other => Err(other),
            },
        }
    }

    async fn exists(&self, name: &str) -> std::result::Result<bool, RuntimeError> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match classify(name, e) {
                RuntimeError::NotFound { .. } => Ok(false),
                other => Err(other),
            },
        }
    }
}

/// Remove a container that was created but failed to start.
///
/// Returns whether the name is gone afterwards; failures are logged.
async fn discard_unstarted(runtime: &dyn ContainerRuntime, name: &str) -> bool {
    match runtime.remove(name).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Failed to remove unstarted container {}: {}", name, e);
            false
        }
    }
}

/// Map a bollard error onto [`RuntimeError`].
///
/// 409 on removal means an auto-remove is already in flight, which counts as
/// gone.
fn classify(name: &str, error: BollardError) -> RuntimeError {
    match error {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => RuntimeError::NotFound {
            name: name.to_string(),
        },
        BollardError::DockerResponseServerError {
            status_code: 409,
            ref message,
        } if message.contains("already in progress") => RuntimeError::NotFound {
            name: name.to_string(),
        },
        BollardError::DockerResponseServerError { message, .. } => {
            RuntimeError::Rejected { reason: message }
        }
        other @ (BollardError::IOError { .. }
        | BollardError::HyperResponseError { .. }
        | BollardError::RequestTimeoutError) => RuntimeError::Unavailable {
            reason: other.to_string(),
        },
        other => RuntimeError::Rejected {
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubRuntime;

    fn server_error(status_code: u16, message: &str) -> BollardError {
        BollardError::DockerResponseServerError {
            status_code,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify_not_found() {
        assert_eq!(
            classify("ls-ext-qdrant", server_error(404, "No such container")),
            RuntimeError::NotFound {
                name: "ls-ext-qdrant".to_string()
            }
        );
    }

    #[test]
    fn test_classify_removal_in_progress_is_gone() {
        let err = server_error(
            409,
            "removal of container ls-ext-qdrant is already in progress",
        );
        assert!(matches!(
            classify("ls-ext-qdrant", err),
            RuntimeError::NotFound { .. }
        ));
    }

    #[test]
    fn test_classify_name_conflict_is_rejected() {
        let err = server_error(409, "Conflict. The container name is already in use");
        assert!(matches!(
            classify("ls-ext-qdrant", err),
            RuntimeError::Rejected { .. }
        ));
    }

    #[test]
    fn test_classify_port_conflict_is_rejected() {
        let err = server_error(500, "port is already allocated");
        assert_eq!(
            classify("ls-ext-qdrant", err),
            RuntimeError::Rejected {
                reason: "port is already allocated".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_discard_unstarted_reports_removal_failure() {
        let runtime = StubRuntime::new();
        let request = RunRequest {
            name: "ls-ext-qdrant".to_string(),
            image: "qdrant/qdrant:latest".to_string(),
            ports: vec![6333],
            command: None,
            env: Default::default(),
            mounts: Vec::new(),
            auto_remove: true,
        };
        runtime.run(&request).await.unwrap();

        runtime.set_removal_failing(true);
        assert!(!discard_unstarted(&runtime, "ls-ext-qdrant").await);
        assert!(runtime.is_present("ls-ext-qdrant"));

        runtime.set_removal_failing(false);
        assert!(discard_unstarted(&runtime, "ls-ext-qdrant").await);
        assert!(!runtime.is_present("ls-ext-qdrant"));
        assert_eq!(runtime.remove_calls(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_fallback_sockets_end_in_docker_sock() {
        for socket in fallback_sockets() {
            assert!(socket.ends_with("docker.sock"));
        }
    }
}
