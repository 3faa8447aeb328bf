//! Endpoint description handed to consumers of a sidecar.

use std::fmt;

use serde::Serialize;

/// URL scheme the sidecar serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    /// `https` iff TLS is enabled.
    pub fn for_tls(tls: bool) -> Self {
        if tls { Protocol::Https } else { Protocol::Http }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to reach a sidecar.
///
/// Derived on demand from static configuration; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_port: Option<u16>,
    pub protocol: Protocol,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_url: Option<String>,
}

impl ConnectionInfo {
    /// Compose the endpoint description. No network calls.
    pub fn derive(host: &str, port: u16, grpc_port: Option<u16>, tls: bool) -> Self {
        let protocol = Protocol::for_tls(tls);
        // IPv6 literals need brackets inside a URL.
        let url_host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.to_string()
        };

        Self {
            host: host.to_string(),
            port,
            grpc_port,
            protocol,
            url: format!("{protocol}://{url_host}:{port}"),
            grpc_url: grpc_port.map(|grpc| format!("{protocol}://{url_host}:{grpc}")),
        }
    }
}
