use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};

use crate::config::helpers::env_with_prefix;
use crate::error::ConfigError;
use crate::extension::ConnectionInfo;
use crate::sidecar::{LaunchSpec, Mount, SidecarError};

/// Every variable this resolver looks at starts with this.
pub const ENV_PREFIX: &str = "LOCALSTACK_QDRANT";

pub const API_KEY_VAR: &str = "LOCALSTACK_QDRANT_API_KEY";
pub const TAG_VAR: &str = "LOCALSTACK_QDRANT_TAG";
pub const TLS_CERT_VAR: &str = "LOCALSTACK_QDRANT_TLS_CERT";
pub const TLS_KEY_VAR: &str = "LOCALSTACK_QDRANT_TLS_KEY";

/// Variables with this prefix are forwarded into the container with
/// `LOCALSTACK_` stripped, e.g. `LOCALSTACK_QDRANT__LOG_LEVEL` becomes
/// `QDRANT__LOG_LEVEL`.
pub const PASSTHROUGH_PREFIX: &str = "LOCALSTACK_QDRANT__";
const STRIPPED_PREFIX: &str = "LOCALSTACK_";

pub const IMAGE_REPOSITORY: &str = "qdrant/qdrant";
pub const DEFAULT_TAG: &str = "latest";
pub const DEFAULT_HTTP_PORT: u16 = 6333;
pub const DEFAULT_GRPC_PORT: u16 = 6334;

const TLS_CERT_MOUNT: &str = "/qdrant/tls/cert.pem";
const TLS_KEY_MOUNT: &str = "/qdrant/tls/key.pem";

/// Host paths of the TLS certificate pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: String,
    pub key: String,
}

/// Qdrant sidecar configuration.
///
/// Resolved once from an enumerated environment snapshot; the lifecycle
/// manager only ever sees the resulting [`LaunchSpec`].
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Forwarded as `QDRANT__SERVICE__API_KEY`.
    pub api_key: Option<SecretString>,
    /// Image tag.
    pub tag: String,
    /// Enables HTTPS when both paths are set.
    pub tls: Option<TlsPaths>,
    /// Extra container environment from `LOCALSTACK_QDRANT__*`.
    pub passthrough: BTreeMap<String, String>,
    pub http_port: u16,
    pub grpc_port: u16,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            tag: DEFAULT_TAG.to_string(),
            tls: None,
            passthrough: BTreeMap::new(),
            http_port: DEFAULT_HTTP_PORT,
            grpc_port: DEFAULT_GRPC_PORT,
        }
    }
}

impl QdrantConfig {
    /// Resolve from the process environment.
    pub fn resolve() -> Result<Self, ConfigError> {
        Ok(Self::resolve_from(env_with_prefix(ENV_PREFIX)?))
    }

    /// Resolve from an explicit set of variables.
    ///
    /// An empty API key, tag or TLS path counts as unset. Pass-through
    /// values are forwarded as given, empty or not.
    pub fn resolve_from<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let setting = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        let defaults = Self::default();

        let tls = match (setting(TLS_CERT_VAR), setting(TLS_KEY_VAR)) {
            (Some(cert), Some(key)) => Some(TlsPaths { cert, key }),
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "Only one of {} and {} is set; TLS stays disabled",
                    TLS_CERT_VAR,
                    TLS_KEY_VAR
                );
                None
            }
        };

        let passthrough = vars
            .iter()
            .filter(|(key, _)| key.starts_with(PASSTHROUGH_PREFIX))
            .map(|(key, value)| (key[STRIPPED_PREFIX.len()..].to_string(), value.clone()))
            .collect();

        Self {
            api_key: setting(API_KEY_VAR).map(SecretString::from),
            tag: setting(TAG_VAR).unwrap_or(defaults.tag),
            tls,
            passthrough,
            ..defaults
        }
    }

    /// Whether the sidecar serves HTTPS.
    pub fn use_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Full image reference.
    pub fn image(&self) -> String {
        format!("{IMAGE_REPOSITORY}:{}", self.tag)
    }

    /// HTTP and gRPC endpoints as seen from `host`.
    pub fn connection_info(&self, host: &str) -> ConnectionInfo {
        ConnectionInfo::derive(host, self.http_port, Some(self.grpc_port), self.use_tls())
    }

    /// Build the launch spec: both ports published, TCP readiness on the
    /// HTTP port.
    pub fn launch_spec(&self) -> Result<LaunchSpec, SidecarError> {
        let mut builder = LaunchSpec::builder(self.image(), vec![self.http_port, self.grpc_port]);

        if let Some(api_key) = &self.api_key {
            builder = builder.env_var("QDRANT__SERVICE__API_KEY", api_key.expose_secret());
        }

        builder = builder.envs(self.passthrough.clone());

        if let Some(tls) = &self.tls {
            builder = builder
                .mount(Mount::new(&tls.cert, TLS_CERT_MOUNT))
                .mount(Mount::new(&tls.key, TLS_KEY_MOUNT))
                .env_var("QDRANT__TLS__HTTPS__ENABLE", "true")
                .env_var("QDRANT__TLS__HTTPS__CERT", TLS_CERT_MOUNT)
                .env_var("QDRANT__TLS__HTTPS__KEY", TLS_KEY_MOUNT);
        }

        builder.build()
    }
}
