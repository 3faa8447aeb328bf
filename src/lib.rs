//! Qdrant sidecar supervisor.
//!
//! Runs Qdrant in a Docker container behind a host's
//! load → start → shutdown lifecycle hooks:
//! - [`sidecar`]: the generic container lifecycle manager (launch spec,
//!   idempotent start, bounded readiness wait, cleanup)
//! - [`extension`]: the hook surface and the Qdrant-specific glue
//! - [`config`]: environment-derived configuration

pub mod cli;
pub mod config;
pub mod error;
pub mod extension;
pub mod sidecar;
pub mod testing;
