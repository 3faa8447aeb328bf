//! Test doubles for driving the sidecar manager without a Docker daemon.
//!
//! Provides:
//! - [`StubRuntime`]: an in-memory [`ContainerRuntime`] with call counting,
//!   failure toggling and an optional artificial run delay
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use qdrant_sidecar::sidecar::{LaunchSpec, Readiness, SidecarManager};
//! use qdrant_sidecar::testing::StubRuntime;
//!
//! # async fn example() {
//! let runtime = Arc::new(StubRuntime::new());
//! let spec = LaunchSpec::builder("busybox", vec![8080])
//!     .readiness(Readiness::custom(|| Ok(true)))
//!     .build()
//!     .unwrap();
//! let manager = SidecarManager::new("demo", spec, "localhost", runtime.clone());
//! manager.start().await.unwrap();
//! assert_eq!(runtime.run_calls(), 1);
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::sidecar::runtime::{ContainerRuntime, Removal, RunRequest, RuntimeError};

/// In-memory container runtime.
///
/// Tracks which container names are "present" so tests can assert that a
/// failed start leaves nothing behind.
#[derive(Debug, Default)]
pub struct StubRuntime {
    present: Mutex<HashSet<String>>,
    requests: Mutex<Vec<RunRequest>>,
    run_calls: AtomicU32,
    remove_calls: AtomicU32,
    should_fail: AtomicBool,
    fail_removal: AtomicBool,
    run_delay: Option<Duration>,
}

impl StubRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every `run` call, widening race windows.
    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = Some(delay);
        self
    }

    /// Make subsequent `run` calls fail with [`RuntimeError::Rejected`].
    pub fn set_failing(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `remove` calls fail with [`RuntimeError::Unavailable`].
    pub fn set_removal_failing(&self, fail: bool) {
        self.fail_removal.store(fail, Ordering::SeqCst);
    }

    pub fn run_calls(&self) -> u32 {
        self.run_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> u32 {
        self.remove_calls.load(Ordering::SeqCst)
    }

    /// Every run request received, in order.
    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether a container with this name is currently present.
    pub fn is_present(&self, name: &str) -> bool {
        self.present
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(name)
    }
}

#[async_trait]
impl ContainerRuntime for StubRuntime {
    async fn run(&self, request: &RunRequest) -> Result<String, RuntimeError> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        if let Some(delay) = self.run_delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(RuntimeError::Rejected {
                reason: format!("stub refused to run {}", request.image),
            });
        }

        let mut present = self.present.lock().unwrap_or_else(|e| e.into_inner());
        if !present.insert(request.name.clone()) {
            return Err(RuntimeError::Rejected {
                reason: format!("container name '{}' is already in use", request.name),
            });
        }

        Ok(format!("stub-{}", request.name))
    }

    async fn remove(&self, name: &str) -> Result<Removal, RuntimeError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_removal.load(Ordering::SeqCst) {
            return Err(RuntimeError::Unavailable {
                reason: "stub daemon went away".to_string(),
            });
        }

        let removed = self
            .present
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
        Ok(if removed {
            Removal::Removed
        } else {
            Removal::Absent
        })
    }

    async fn exists(&self, name: &str) -> Result<bool, RuntimeError> {
        Ok(self.is_present(name))
    }
}
