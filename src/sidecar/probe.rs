//! Readiness probes.
//!
//! A probe answers one question per call: is the sidecar accepting traffic
//! yet? [`RetryGate`](crate::sidecar::RetryGate) calls it repeatedly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::sidecar::config::{Predicate, ReadinessCheck};
use crate::sidecar::error::{Result, SidecarError};

/// Per-attempt connect timeout for the TCP probe.
pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors a custom readiness predicate may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Not ready yet; the attempt is retried.
    #[error("not ready: {0}")]
    NotReady(String),
    /// Unrecoverable; the readiness wait stops immediately.
    #[error("{0}")]
    Fatal(String),
}

/// Result of a single probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready,
    NotReady(String),
}

/// A single readiness attempt.
///
/// `Ok(NotReady)` is swallowed and retried by the gate. `Err` aborts the wait.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Perform one attempt.
    async fn attempt(&self) -> Result<ProbeOutcome>;

    /// Human-readable target, used in logs and errors.
    fn target(&self) -> String;
}

/// Build the probe described by a [`ReadinessCheck`] against `host`.
pub fn probe_for(check: &ReadinessCheck, host: &str) -> Box<dyn ReadinessProbe> {
    match check {
        ReadinessCheck::Tcp { port } => Box::new(TcpProbe::new(host, *port)),
        ReadinessCheck::Custom(predicate) => Box::new(PredicateProbe::new(predicate.clone())),
    }
}

/// Bare connect-then-close probe. No bytes are exchanged.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: TCP_CONNECT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ReadinessProbe for TcpProbe {
    async fn attempt(&self) -> Result<ProbeOutcome> {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(stream)) => {
                drop(stream);
                Ok(ProbeOutcome::Ready)
            }
            Ok(Err(e)) => Ok(ProbeOutcome::NotReady(format!(
                "port {} not ready: {}",
                self.port, e
            ))),
            Err(_) => Ok(ProbeOutcome::NotReady(format!(
                "port {} not ready: connect timed out after {:?}",
                self.port, self.timeout
            ))),
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Runs a caller-supplied predicate on the blocking pool.
pub struct PredicateProbe {
    predicate: Predicate,
}

impl PredicateProbe {
    pub fn new(predicate: Predicate) -> Self {
        Self { predicate }
    }
}

#[async_trait]
impl ReadinessProbe for PredicateProbe {
    async fn attempt(&self) -> Result<ProbeOutcome> {
        let predicate = Arc::clone(&self.predicate);
        let joined = tokio::task::spawn_blocking(move || predicate()).await;

        match joined {
            Ok(Ok(true)) => Ok(ProbeOutcome::Ready),
            Ok(Ok(false)) => Ok(ProbeOutcome::NotReady(
                "readiness predicate returned false".to_string(),
            )),
            Ok(Err(ProbeError::NotReady(reason))) => Ok(ProbeOutcome::NotReady(reason)),
            Ok(Err(ProbeError::Fatal(reason))) => Err(SidecarError::ProbeAborted {
                target: self.target(),
                reason,
            }),
            Err(e) => Err(SidecarError::ProbeAborted {
                target: self.target(),
                reason: format!("readiness predicate panicked: {e}"),
            }),
        }
    }

    fn target(&self) -> String {
        "custom readiness predicate".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidecar::config::predicate;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_probe_ready_when_listening() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpProbe::new("127.0.0.1", port);
        assert_eq!(probe.attempt().await.unwrap(), ProbeOutcome::Ready);
        assert_eq!(probe.target(), format!("127.0.0.1:{port}"));
    }

    #[tokio::test]
    async fn test_tcp_probe_not_ready_when_closed() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = TcpProbe::new("127.0.0.1", port).with_timeout(Duration::from_millis(500));
        match probe.attempt().await.unwrap() {
            ProbeOutcome::NotReady(reason) => assert!(reason.contains(&port.to_string())),
            ProbeOutcome::Ready => panic!("nothing is listening on port {port}"),
        }
    }

    #[tokio::test]
    async fn test_predicate_true_is_ready() {
        let probe = PredicateProbe::new(predicate(|| Ok(true)));
        assert_eq!(probe.attempt().await.unwrap(), ProbeOutcome::Ready);
    }

    #[tokio::test]
    async fn test_predicate_false_is_not_ready() {
        let probe = PredicateProbe::new(predicate(|| Ok(false)));
        assert!(matches!(
            probe.attempt().await.unwrap(),
            ProbeOutcome::NotReady(_)
        ));
    }

    #[tokio::test]
    async fn test_predicate_not_ready_error_is_retryable() {
        let probe =
            PredicateProbe::new(predicate(|| Err(ProbeError::NotReady("warming up".into()))));
        assert_eq!(
            probe.attempt().await.unwrap(),
            ProbeOutcome::NotReady("warming up".to_string())
        );
    }

    #[tokio::test]
    async fn test_predicate_fatal_error_aborts() {
        let probe = PredicateProbe::new(predicate(|| Err(ProbeError::Fatal("bad creds".into()))));
        let err = probe.attempt().await.unwrap_err();
        assert_eq!(
            err,
            SidecarError::ProbeAborted {
                target: "custom readiness predicate".to_string(),
                reason: "bad creds".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_predicate_panic_aborts() {
        let probe = PredicateProbe::new(predicate(|| panic!("boom")));
        assert!(matches!(
            probe.attempt().await,
            Err(SidecarError::ProbeAborted { .. })
        ));
    }

    #[test]
    fn test_probe_for_selects_variant() {
        let tcp = probe_for(&ReadinessCheck::Tcp { port: 6333 }, "localhost");
        assert_eq!(tcp.target(), "localhost:6333");

        let custom = probe_for(&ReadinessCheck::Custom(predicate(|| Ok(true))), "localhost");
        assert_eq!(custom.target(), "custom readiness predicate");
    }
}
