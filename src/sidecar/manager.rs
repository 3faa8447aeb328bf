//! Sidecar lifecycle management.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};

use crate::sidecar::config::LaunchSpec;
use crate::sidecar::error::{Result, SidecarError};
use crate::sidecar::name::container_name;
use crate::sidecar::probe::{ReadinessProbe, probe_for};
use crate::sidecar::retry::RetryGate;
use crate::sidecar::runtime::{ContainerRuntime, Removal, RunRequest};

/// State of a sidecar container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarState {
    /// Not started yet.
    NotStarted,
    /// Run request issued, waiting for readiness.
    Starting,
    /// Running and ready.
    Running,
    /// Teardown in progress.
    Stopping,
    /// Removed on shutdown.
    Stopped,
    /// Start failed; terminal.
    Failed,
}

impl SidecarState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SidecarState::NotStarted => "not started",
            SidecarState::Starting => "starting",
            SidecarState::Running => "running",
            SidecarState::Stopping => "stopping",
            SidecarState::Stopped => "stopped",
            SidecarState::Failed => "failed",
        }
    }
}

impl fmt::Display for SidecarState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manages a single sidecar container.
///
/// `start()` runs at most once per manager: the first caller issues the run
/// request and waits for readiness, every other caller (concurrent or later)
/// awaits and receives that same outcome. A failed readiness wait removes the
/// container before the error is returned. `stop()` is best-effort and never
/// fails.
pub struct SidecarManager {
    name: String,
    container_name: String,
    spec: LaunchSpec,
    host: String,
    runtime: Arc<dyn ContainerRuntime>,
    retry: RetryGate,
    state: RwLock<SidecarState>,
    started: OnceCell<Result<()>>,
}

impl SidecarManager {
    /// Create a manager for the logical service `name`.
    ///
    /// `host` is the address at which published ports are reachable.
    pub fn new(
        name: impl Into<String>,
        spec: LaunchSpec,
        host: impl Into<String>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        let name = name.into();
        Self {
            container_name: container_name(&name),
            name,
            spec,
            host: host.into(),
            runtime,
            retry: RetryGate::default(),
            state: RwLock::new(SidecarState::NotStarted),
            started: OnceCell::new(),
        }
    }

    /// Replace the default readiness cadence.
    pub fn with_retry(mut self, retry: RetryGate) -> Self {
        self.retry = retry;
        self
    }

    /// Get the current state.
    pub async fn state(&self) -> SidecarState {
        *self.state.read().await
    }

    /// Check if the sidecar is running and ready.
    pub async fn is_running(&self) -> bool {
        *self.state.read().await == SidecarState::Running
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derived runtime container name.
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Start the container and wait until it is ready.
    ///
    /// Idempotent: only the first call does any work.
    pub async fn start(&self) -> Result<()> {
        self.started.get_or_init(|| self.launch()).await.clone()
    }

    /// The one-shot body behind [`start`](Self::start).
    async fn launch(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            match *state {
                SidecarState::NotStarted => *state = SidecarState::Starting,
                SidecarState::Stopping | SidecarState::Stopped => {
                    return Err(self.stopped_error());
                }
                // A previous launch was cancelled part way through.
                _ => {
                    return Err(SidecarError::StartInterrupted {
                        name: self.container_name.clone(),
                    });
                }
            }
        }

        tracing::debug!("Starting sidecar container {}", self.container_name);

        let request = RunRequest::from_spec(&self.container_name, &self.spec);
        if let Err(e) = self.runtime.run(&request).await {
            tracing::warn!(
                "Container runtime rejected {}: {}",
                self.container_name,
                e
            );
            self.transition(SidecarState::Starting, SidecarState::Failed)
                .await;
            return Err(SidecarError::ContainerStart {
                name: self.container_name.clone(),
                reason: e.to_string(),
            });
        }

        // stop() may have found nothing to remove while run was in flight.
        if *self.state.read().await != SidecarState::Starting {
            return Err(self.abandon().await);
        }

        let probe = self.probe();
        if let Err(e) = self.retry.wait(probe.as_ref()).await {
            tracing::info!(
                "Failed to connect to container {}: {}",
                self.container_name,
                e
            );
            self.remove_container().await;
            self.transition(SidecarState::Starting, SidecarState::Failed)
                .await;
            return Err(e);
        }

        if !self
            .transition(SidecarState::Starting, SidecarState::Running)
            .await
        {
            return Err(self.abandon().await);
        }

        tracing::info!(
            "Successfully started sidecar container {} ({})",
            self.container_name,
            probe.target()
        );
        Ok(())
    }

    fn probe(&self) -> Box<dyn ReadinessProbe> {
        probe_for(self.spec.readiness(), &self.host)
    }

    fn stopped_error(&self) -> SidecarError {
        SidecarError::AlreadyStopped {
            name: self.container_name.clone(),
        }
    }

    /// Tear down a container whose launch lost the race against `stop()`.
    async fn abandon(&self) -> SidecarError {
        tracing::info!(
            "Sidecar {} was stopped during startup, removing container",
            self.container_name
        );
        self.remove_container().await;
        self.stopped_error()
    }

    /// Move to `to` only if still in `from`; a concurrent `stop()` wins.
    async fn transition(&self, from: SidecarState, to: SidecarState) -> bool {
        let mut state = self.state.write().await;
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }

    /// Remove the container, tolerating its absence.
    ///
    /// Safe from any state and safe to call repeatedly. A start that has not
    /// happened yet will refuse to run afterwards. A failed start stays
    /// `Failed`.
    pub async fn stop(&self) {
        let previous = {
            let mut state = self.state.write().await;
            let previous = *state;
            if previous != SidecarState::Failed {
                *state = SidecarState::Stopping;
            }
            previous
        };

        tracing::debug!(
            "Stopping sidecar container {} (was {})",
            self.container_name,
            previous
        );
        self.remove_container().await;

        if previous != SidecarState::Failed {
            *self.state.write().await = SidecarState::Stopped;
        }
    }

    async fn remove_container(&self) {
        match self.runtime.remove(&self.container_name).await {
            Ok(Removal::Removed) => {
                tracing::info!("Removed sidecar container {}", self.container_name);
            }
            Ok(Removal::Absent) => {
                tracing::debug!("Sidecar container {} already gone", self.container_name);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to remove sidecar container {}: {}",
                    self.container_name,
                    e
                );
            }
        }
    }
}

impl fmt::Debug for SidecarManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SidecarManager")
            .field("name", &self.name)
            .field("container_name", &self.container_name)
            .field("host", &self.host)
            .field("spec", &self.spec)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Drop for SidecarManager {
    fn drop(&mut self) {
        if let Ok(state) = self.state.try_read()
            && *state == SidecarState::Running
        {
            tracing::warn!(
                "SidecarManager '{}' dropped without stop(), container {} may remain running",
                self.name,
                self.container_name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubRuntime;

    fn manager(runtime: Arc<StubRuntime>) -> SidecarManager {
        let spec = LaunchSpec::builder("qdrant/qdrant:latest", vec![6333, 6334])
            .build()
            .unwrap();
        SidecarManager::new("qdrant-extension", spec, "localhost", runtime)
    }

    #[test]
    fn test_initial_state() {
        let manager = manager(Arc::new(StubRuntime::new()));

        assert_eq!(
            tokio_test::block_on(manager.state()),
            SidecarState::NotStarted
        );
        assert_eq!(manager.container_name(), "ls-ext-qdrant-extension");
        assert_eq!(manager.name(), "qdrant-extension");
        assert_eq!(manager.host(), "localhost");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SidecarState::Running.to_string(), "running");
        assert_eq!(SidecarState::Failed.to_string(), "failed");
    }

    #[tokio::test]
    async fn test_stop_before_start_blocks_later_start() {
        let runtime = Arc::new(StubRuntime::new());
        let manager = manager(runtime.clone());

        manager.stop().await;
        assert_eq!(manager.state().await, SidecarState::Stopped);

        let err = manager.start().await.unwrap_err();
        assert!(matches!(err, SidecarError::AlreadyStopped { .. }));
        assert_eq!(runtime.run_calls(), 0);
    }
}
