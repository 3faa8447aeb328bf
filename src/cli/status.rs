//! `status` and `stop`: inspect or clean up the sidecar container out of band.

use crate::extension::qdrant::EXTENSION_NAME;
use crate::sidecar::detect::check_docker;
use crate::sidecar::{ContainerRuntime, DockerRuntime, Removal, container_name};

/// Report Docker availability and whether the sidecar container exists.
pub async fn run_status_command() -> anyhow::Result<()> {
    let detection = check_docker().await;
    println!("Docker: {}", detection.status.as_str());

    if let Some(hint) = detection.hint() {
        println!("  {hint}");
        return Ok(());
    }

    let name = container_name(EXTENSION_NAME);
    let runtime = DockerRuntime::connect().await?;
    let state = if runtime.exists(&name).await? {
        "present"
    } else {
        "absent"
    };
    println!("Container {name}: {state}");
    Ok(())
}

/// Force-remove the sidecar container, e.g. after the host crashed.
pub async fn run_stop_command() -> anyhow::Result<()> {
    let name = container_name(EXTENSION_NAME);
    let runtime = DockerRuntime::connect().await?;

    match runtime.remove(&name).await? {
        Removal::Removed => println!("Removed container {name}"),
        Removal::Absent => println!("Container {name} not found"),
    }
    Ok(())
}
