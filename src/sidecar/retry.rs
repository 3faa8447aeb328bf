//! Fixed-cadence readiness polling.

use std::time::Duration;

use crate::sidecar::error::{Result, SidecarError};
use crate::sidecar::probe::{ProbeOutcome, ReadinessProbe};

/// Default number of probe attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Default delay between failed attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Bounded polling loop around a [`ReadinessProbe`].
///
/// No backoff: the probe runs every `interval` until it succeeds or
/// `max_attempts` is exhausted. Worst-case wait is roughly
/// `max_attempts * interval` plus the probes' own time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryGate {
    max_attempts: u32,
    interval: Duration,
}

impl Default for RetryGate {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RetryGate {
    /// A gate making at least one attempt.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `probe` until it reports ready.
    ///
    /// Returns the number of attempts it took. Attempt failures are only
    /// logged; an `Err` from the probe itself is returned immediately.
    pub async fn wait(&self, probe: &dyn ReadinessProbe) -> Result<u32> {
        let mut last_reason = String::new();

        for attempt in 1..=self.max_attempts {
            match probe.attempt().await? {
                ProbeOutcome::Ready => {
                    tracing::debug!("{} ready after {} attempt(s)", probe.target(), attempt);
                    return Ok(attempt);
                }
                ProbeOutcome::NotReady(reason) => {
                    tracing::trace!(
                        "Readiness attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_attempts,
                        probe.target(),
                        reason
                    );
                    last_reason = reason;
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(SidecarError::ReadinessTimeout {
            target: probe.target(),
            attempts: self.max_attempts,
            interval: self.interval,
            last_reason,
        })
    }
}
