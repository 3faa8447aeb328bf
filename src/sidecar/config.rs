//! Launch specification for a sidecar container.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::sidecar::error::{Result, SidecarError};
use crate::sidecar::probe::ProbeError;

/// Caller-supplied readiness predicate.
///
/// Returning `Ok(false)` or `Err(ProbeError::NotReady)` counts as a failed
/// attempt. `Err(ProbeError::Fatal)` aborts the readiness wait.
pub type Predicate = Arc<dyn Fn() -> std::result::Result<bool, ProbeError> + Send + Sync>;

/// Wrap a closure as a [`Predicate`].
pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn() -> std::result::Result<bool, ProbeError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// How readiness is requested when building a [`LaunchSpec`].
#[derive(Clone, Default)]
pub enum Readiness {
    /// TCP connect probe on the first exposed port.
    #[default]
    Tcp,
    /// TCP connect probe on an explicit port.
    TcpPort(u16),
    /// Custom predicate.
    Custom(Predicate),
}

impl Readiness {
    /// Readiness decided by a caller-supplied predicate.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn() -> std::result::Result<bool, ProbeError> + Send + Sync + 'static,
    {
        Readiness::Custom(predicate(f))
    }
}

impl fmt::Debug for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Tcp => f.write_str("Tcp"),
            Readiness::TcpPort(port) => f.debug_tuple("TcpPort").field(port).finish(),
            Readiness::Custom(_) => f.write_str("Custom(<predicate>)"),
        }
    }
}

/// Resolved readiness check carried by a validated [`LaunchSpec`].
#[derive(Clone)]
pub enum ReadinessCheck {
    /// Connect to this published port.
    Tcp {
        /// Port on the container host.
        port: u16,
    },
    /// Invoke the predicate.
    Custom(Predicate),
}

impl ReadinessCheck {
    /// Port probed by the TCP variant.
    pub fn port(&self) -> Option<u16> {
        match self {
            ReadinessCheck::Tcp { port } => Some(*port),
            ReadinessCheck::Custom(_) => None,
        }
    }
}

impl fmt::Debug for ReadinessCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessCheck::Tcp { port } => f.debug_struct("Tcp").field("port", port).finish(),
            ReadinessCheck::Custom(_) => f.write_str("Custom(<predicate>)"),
        }
    }
}

/// A `hostPath:containerPath` bind mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Path on the host.
    pub host_path: String,
    /// Path inside the container.
    pub container_path: String,
}

impl Mount {
    pub fn new(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
        }
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_path, self.container_path)
    }
}

impl FromStr for Mount {
    type Err = SidecarError;

    /// Splits on the last `:` so that Windows drive letters stay in the host path.
    fn from_str(s: &str) -> Result<Self> {
        match s.rsplit_once(':') {
            Some((host, container)) if !host.is_empty() && !container.is_empty() => {
                Ok(Mount::new(host, container))
            }
            _ => Err(SidecarError::InvalidSpec {
                reason: format!("mount '{s}' is not of the form hostPath:containerPath"),
            }),
        }
    }
}

/// Immutable description of the container to run.
///
/// Built through [`LaunchSpec::builder`]; the only validation is that at
/// least one port is exposed. Everything else is the runtime's concern.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    image: String,
    ports: Vec<u16>,
    command: Option<Vec<String>>,
    env: BTreeMap<String, String>,
    mounts: Vec<Mount>,
    readiness: ReadinessCheck,
}

impl LaunchSpec {
    /// Start building a spec for `image` publishing `ports`.
    pub fn builder(image: impl Into<String>, ports: impl Into<Vec<u16>>) -> LaunchSpecBuilder {
        LaunchSpecBuilder {
            image: image.into(),
            ports: ports.into(),
            command: None,
            env: BTreeMap::new(),
            mounts: Vec::new(),
            readiness: Readiness::default(),
        }
    }

    /// Image reference, possibly with a tag.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Published ports; container port equals host port. Never empty.
    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    /// First exposed port.
    pub fn primary_port(&self) -> u16 {
        self.ports[0]
    }

    pub fn command(&self) -> Option<&[String]> {
        self.command.as_deref()
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    pub fn readiness(&self) -> &ReadinessCheck {
        &self.readiness
    }
}

/// Builder for [`LaunchSpec`].
#[derive(Debug, Clone)]
pub struct LaunchSpecBuilder {
    image: String,
    ports: Vec<u16>,
    command: Option<Vec<String>>,
    env: BTreeMap<String, String>,
    mounts: Vec<Mount>,
    readiness: Readiness,
}

impl LaunchSpecBuilder {
    /// Override the image's default command.
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    /// Set a single environment variable.
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Merge a set of environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a bind mount.
    pub fn mount(mut self, mount: Mount) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    /// Validate and freeze the spec.
    pub fn build(self) -> Result<LaunchSpec> {
        let Some(&first) = self.ports.first() else {
            return Err(SidecarError::InvalidSpec {
                reason: "at least one port must be exposed".to_string(),
            });
        };
        if self.ports.contains(&0) {
            return Err(SidecarError::InvalidSpec {
                reason: "ports must be positive".to_string(),
            });
        }

        let readiness = match self.readiness {
            Readiness::Tcp => ReadinessCheck::Tcp { port: first },
            Readiness::TcpPort(port) => ReadinessCheck::Tcp { port },
            Readiness::Custom(predicate) => ReadinessCheck::Custom(predicate),
        };

        Ok(LaunchSpec {
            image: self.image,
            ports: self.ports,
            command: self.command,
            env: self.env,
            mounts: self.mounts,
            readiness,
        })
    }
}
