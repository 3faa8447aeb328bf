//! Docker availability detection with platform-specific guidance.
//!
//! Used by the `status` command to explain why a sidecar cannot start
//! before anything is attempted.

use std::path::Path;

use crate::sidecar::docker::connect_docker;

/// Docker daemon availability status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerStatus {
    /// Daemon responding to ping.
    Available,
    /// No `docker` binary on PATH and no daemon reachable.
    NotInstalled,
    /// Binary found but daemon not responding.
    NotRunning,
}

impl DockerStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, DockerStatus::Available)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DockerStatus::Available => "available",
            DockerStatus::NotInstalled => "not installed",
            DockerStatus::NotRunning => "not running",
        }
    }
}

/// Host platform for install guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::MacOS,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    pub fn install_hint(&self) -> &'static str {
        match self {
            Platform::MacOS => {
                "Install Docker Desktop: https://docs.docker.com/desktop/install/mac-install/"
            }
            Platform::Linux => "Install Docker Engine: https://docs.docker.com/engine/install/",
            Platform::Windows => {
                "Install Docker Desktop: https://docs.docker.com/desktop/install/windows-install/"
            }
        }
    }

    pub fn start_hint(&self) -> &'static str {
        match self {
            Platform::MacOS => "Start Docker Desktop from Applications, or run: open -a Docker",
            Platform::Linux => "Start the Docker daemon: sudo systemctl start docker",
            Platform::Windows => "Start Docker Desktop from the Start menu",
        }
    }
}

/// Result of a Docker detection check.
#[derive(Debug, Clone, Copy)]
pub struct DockerDetection {
    pub status: DockerStatus,
    pub platform: Platform,
}

impl DockerDetection {
    /// What the user should do next, if anything.
    pub fn hint(&self) -> Option<&'static str> {
        match self.status {
            DockerStatus::Available => None,
            DockerStatus::NotInstalled => Some(self.platform.install_hint()),
            DockerStatus::NotRunning => Some(self.platform.start_hint()),
        }
    }
}

/// Check whether Docker is reachable, and if not, whether it is installed.
///
/// A reachable daemon wins even without a local binary (remote `DOCKER_HOST`).
pub async fn check_docker() -> DockerDetection {
    let platform = Platform::current();

    let status = if connect_docker().await.is_ok() {
        DockerStatus::Available
    } else if docker_binary_on_path() {
        DockerStatus::NotRunning
    } else {
        DockerStatus::NotInstalled
    };

    DockerDetection { status, platform }
}

fn docker_binary_on_path() -> bool {
    let binary = if cfg!(windows) { "docker.exe" } else { "docker" };
    std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths).any(|dir| is_file(&dir.join(binary)))
    })
}

fn is_file(path: &Path) -> bool {
    path.metadata().is_ok_and(|m| m.is_file())
}
