//! Qdrant vector database extension.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::QdrantConfig;
use crate::extension::{ConnectionInfo, ContainerExtension, Extension};
use crate::sidecar::{ContainerRuntime, Result, RetryGate, SidecarManager};

/// Logical name; the container is named `ls-ext-qdrant-extension`.
pub const EXTENSION_NAME: &str = "qdrant-extension";

/// Runs Qdrant as a sidecar and describes its HTTP and gRPC endpoints.
#[derive(Debug)]
pub struct QdrantExtension {
    inner: ContainerExtension,
    config: QdrantConfig,
}

impl QdrantExtension {
    /// Build the launch spec from `config` and bind it to `runtime`.
    ///
    /// `host` is the address at which the published ports are reachable.
    pub fn new(
        config: &QdrantConfig,
        host: impl Into<String>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Result<Self> {
        let spec = config.launch_spec()?;
        let manager = SidecarManager::new(EXTENSION_NAME, spec, host, runtime);

        Ok(Self {
            inner: ContainerExtension::new(manager),
            config: config.clone(),
        })
    }

    /// Replace the default readiness cadence.
    pub fn with_retry(self, retry: RetryGate) -> Self {
        let manager = self.inner.into_manager().with_retry(retry);
        Self {
            inner: ContainerExtension::new(manager),
            config: self.config,
        }
    }

    pub fn manager(&self) -> &SidecarManager {
        self.inner.manager()
    }
}

#[async_trait]
impl Extension for QdrantExtension {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn on_extension_load(&self) {
        self.inner.load();
    }

    async fn on_platform_start(&self) -> Result<()> {
        self.inner.start().await
    }

    async fn on_platform_shutdown(&self) {
        self.inner.shutdown().await;
    }

    fn connection_info(&self) -> ConnectionInfo {
        self.config.connection_info(self.manager().host())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::qdrant::{TLS_CERT_VAR, TLS_KEY_VAR};
    use crate::extension::Protocol;
    use crate::sidecar::{SidecarError, SidecarState};
    use crate::testing::StubRuntime;

    fn extension(config: &QdrantConfig, runtime: Arc<StubRuntime>) -> QdrantExtension {
        QdrantExtension::new(config, "127.0.0.1", runtime)
            .unwrap()
            .with_retry(RetryGate::new(5, Duration::from_millis(20)))
    }

    #[test]
    fn test_container_name() {
        let ext = extension(&QdrantConfig::default(), Arc::new(StubRuntime::new()));
        assert_eq!(ext.name(), "qdrant-extension");
        assert_eq!(ext.manager().container_name(), "ls-ext-qdrant-extension");
    }

    #[test]
    fn test_connection_info_without_tls() {
        let ext = extension(&QdrantConfig::default(), Arc::new(StubRuntime::new()));

        assert_eq!(
            ext.connection_info(),
            ConnectionInfo {
                host: "127.0.0.1".to_string(),
                port: 6333,
                grpc_port: Some(6334),
                protocol: Protocol::Http,
                url: "http://127.0.0.1:6333".to_string(),
                grpc_url: Some("http://127.0.0.1:6334".to_string()),
            }
        );
    }

    #[test]
    fn test_connection_info_with_tls() {
        let config = QdrantConfig::resolve_from([
            (TLS_CERT_VAR, "/certs/cert.pem"),
            (TLS_KEY_VAR, "/certs/key.pem"),
        ]);
        let ext = extension(&config, Arc::new(StubRuntime::new()));
        let info = ext.connection_info();

        assert_eq!(info.protocol, Protocol::Https);
        assert!(info.url.starts_with("https://"));
        assert!(info.grpc_url.unwrap().starts_with("https://"));
    }

    #[tokio::test]
    async fn test_start_against_listening_port() {
        let http = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = QdrantConfig {
            http_port: http.local_addr().unwrap().port(),
            grpc_port: 6334,
            ..Default::default()
        };
        let runtime = Arc::new(StubRuntime::new());
        let ext = extension(&config, runtime.clone());

        ext.on_extension_load();
        ext.on_platform_start().await.unwrap();

        assert_eq!(ext.manager().state().await, SidecarState::Running);
        assert_eq!(runtime.run_calls(), 1);
        assert_eq!(
            runtime.requests()[0].image,
            "qdrant/qdrant:latest".to_string()
        );

        let info = ext.connection_info();
        assert_eq!(info.port, config.http_port);
        assert_eq!(info.protocol, Protocol::Http);

        ext.on_platform_shutdown().await;
        assert_eq!(ext.manager().state().await, SidecarState::Stopped);
        assert!(!runtime.is_present("ls-ext-qdrant-extension"));
    }

    #[tokio::test]
    async fn test_start_times_out_when_nothing_listens() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = QdrantConfig {
            http_port: port,
            ..Default::default()
        };
        let runtime = Arc::new(StubRuntime::new());
        let ext = extension(&config, runtime.clone());

        let err = ext.on_platform_start().await.unwrap_err();

        assert!(matches!(
            err,
            SidecarError::ReadinessTimeout { attempts: 5, .. }
        ));
        assert_eq!(ext.manager().state().await, SidecarState::Failed);
        assert!(!runtime.is_present("ls-ext-qdrant-extension"));
    }
}
