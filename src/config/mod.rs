//! Configuration resolved from the environment.
//!
//! `.env` loading is the binary's job; everything here reads the process
//! environment exactly once per `from_env` call.

mod helpers;
pub mod qdrant;

pub use qdrant::{QdrantConfig, TlsPaths};

use crate::config::helpers::optional_env;
use crate::error::ConfigError;

/// Variable naming the address at which published container ports are reachable.
pub const HOST_VAR: &str = "SIDECAR_HOST";
pub const DEFAULT_HOST: &str = "localhost";

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address consumers use to reach the sidecar's published ports.
    pub host: String,
    pub qdrant: QdrantConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = optional_env(HOST_VAR)?.unwrap_or_else(|| DEFAULT_HOST.to_string());
        validate_host(&host)?;

        Ok(Self {
            host,
            qdrant: QdrantConfig::resolve()?,
        })
    }
}

/// The host is spliced into URLs, so it must be a bare host name or address.
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.contains("://") || host.contains('/') || host.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidValue {
            key: HOST_VAR.to_string(),
            message: format!("'{host}' must be a bare host name or IP address, not a URL"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_host() {
        assert!(validate_host("localhost").is_ok());
        assert!(validate_host("172.17.0.1").is_ok());
        assert!(validate_host("host.docker.internal").is_ok());

        assert!(matches!(
            validate_host("http://localhost"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(validate_host("localhost/qdrant").is_err());
        assert!(validate_host("local host").is_err());
    }
}
