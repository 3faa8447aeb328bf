//! Error types for sidecar management.

use std::time::Duration;

use thiserror::Error;

/// Result type for sidecar operations.
pub type Result<T> = std::result::Result<T, SidecarError>;

/// Errors that can occur during sidecar management.
///
/// `Clone` so that one memoized start outcome can be handed to every caller
/// of [`SidecarManager::start`](crate::sidecar::SidecarManager::start).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SidecarError {
    /// The launch specification is unusable.
    #[error("Invalid launch spec: {reason}")]
    InvalidSpec {
        /// What was wrong with it.
        reason: String,
    },

    /// Docker is not available.
    #[error("Docker not available: {reason}")]
    DockerNotAvailable {
        /// Reason why Docker is unavailable.
        reason: String,
    },

    /// The container runtime rejected the run request.
    #[error("Failed to start container '{name}': {reason}")]
    ContainerStart {
        /// Container name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// The readiness probe never succeeded.
    #[error(
        "{target} not ready after {attempts} attempts ({interval:?} apart): {last_reason}"
    )]
    ReadinessTimeout {
        /// What was being probed.
        target: String,
        /// Number of probe attempts made.
        attempts: u32,
        /// Delay between attempts.
        interval: Duration,
        /// Failure reported by the final attempt.
        last_reason: String,
    },

    /// A custom readiness predicate failed in a way that must not be retried.
    #[error("Readiness probe for {target} aborted: {reason}")]
    ProbeAborted {
        /// What was being probed.
        target: String,
        /// Reason for the abort.
        reason: String,
    },

    /// `stop()` ran before the sidecar became ready.
    #[error("Sidecar '{name}' was stopped before it became ready")]
    AlreadyStopped {
        /// Container name.
        name: String,
    },

    /// An earlier `start()` was cancelled mid-launch, leaving the outcome
    /// unknown.
    #[error("Start of sidecar '{name}' was interrupted while in progress")]
    StartInterrupted {
        /// Container name.
        name: String,
    },
}
