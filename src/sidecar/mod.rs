//! Generic container lifecycle management for a long-lived sidecar.
//!
//! A sidecar is an external service run in a container for the lifetime of
//! the host process:
//! - Started once, even when the start hook fires repeatedly or concurrently
//! - Gated on readiness with a fixed number of probe attempts
//! - Removed again when readiness never arrives
//! - Removed on shutdown, tolerating a container that is already gone
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                           SidecarManager                                   │
//! │                                                                            │
//! │   start()  (one-shot, outcome shared by all callers)                       │
//! │         │                                                                  │
//! │         ▼                                                                  │
//! │   ┌──────────────┐     ┌──────────────────┐     ┌──────────────────────┐  │
//! │   │ LaunchSpec   │────▶│ Runtime run      │────▶│ RetryGate            │  │
//! │   │ → RunRequest │     │ (detached,       │     │  ReadinessProbe      │  │
//! │   │              │     │  auto-remove)    │     │  (TCP | predicate)   │  │
//! │   └──────────────┘     └──────────────────┘     └──────────────────────┘  │
//! │                              │ rejected                 │        │        │
//! │                              ▼                   timeout│        │ready   │
//! │                       ┌──────────────┐     ┌────────────▼──┐  ┌──▼─────┐  │
//! │                       │ Failed       │◀────│ Force remove  │  │Running │  │
//! │                       └──────────────┘     └───────────────┘  └────────┘  │
//! │                                                                            │
//! │   stop()   force remove, absent container is fine → Stopped               │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use qdrant_sidecar::sidecar::{DockerRuntime, LaunchSpec, SidecarManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = LaunchSpec::builder("qdrant/qdrant:latest", vec![6333, 6334])
//!     .env_var("QDRANT__LOG_LEVEL", "debug")
//!     .build()?;
//!
//! let runtime = Arc::new(DockerRuntime::connect().await?);
//! let manager = SidecarManager::new("qdrant-extension", spec, "localhost", runtime);
//!
//! manager.start().await?;
//! println!("{} is running", manager.container_name());
//!
//! manager.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod detect;
pub mod docker;
pub mod error;
pub mod manager;
pub mod name;
pub mod probe;
pub mod retry;
pub mod runtime;

pub use config::{LaunchSpec, LaunchSpecBuilder, Mount, Predicate, Readiness, ReadinessCheck};
pub use docker::{DockerRuntime, connect_docker};
pub use error::{Result, SidecarError};
pub use manager::{SidecarManager, SidecarState};
pub use name::container_name;
pub use probe::{PredicateProbe, ProbeError, ProbeOutcome, ReadinessProbe, TcpProbe};
pub use retry::RetryGate;
pub use runtime::{ContainerRuntime, Removal, RunRequest, RuntimeError};
