//! Shared memory probe
//!
//! Exercises the platform accessor the same way the host does: the probe
//! creates a region as owner, reopens it through a second reference, checks
//! that both agree on size and content, then deletes both references.

use anyhow::{Context, Result};
use clap::Args;
use courier_memory::{
    current_platform, platform_accessor, SharedMemoryAccessor, SharedMemoryRegion,
};
use thiserror::Error;

const MARKER: &[u8] = b"courier";

/// Probe failures
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Could not create shared memory region '{0}'")]
    CreateFailed(String),

    #[error("Could not reopen shared memory region '{0}'")]
    OpenFailed(String),

    #[error("Region '{name}' was created with {created} bytes but opened with {opened}")]
    SizeMismatch {
        name: String,
        created: usize,
        opened: usize,
    },

    #[error("Marker written to '{0}' was not visible through the second reference")]
    MarkerMismatch(String),
}

/// Arguments for the shm-probe command
#[derive(Args)]
pub struct ShmProbeArgs {
    /// Region name
    #[clap(long)]
    pub name: String,

    /// Region size in bytes
    #[clap(long)]
    pub size: usize,
}

/// Run the probe.
pub fn execute(args: &ShmProbeArgs) -> Result<()> {
    let accessor = platform_accessor().context("Shared memory is unavailable")?;
    println!("Platform: {}", current_platform());

    let mut created = accessor
        .try_create(&args.name, args.size)
        .ok_or_else(|| ProbeError::CreateFailed(args.name.clone()))?;
    println!("Created region '{}' ({} bytes)", created.name(), created.size());

    let outcome = check_reopen(accessor.as_ref(), &mut created, args);
    accessor.delete(Some(&mut created));
    outcome?;

    println!("Deleted region '{}'", args.name);
    Ok(())
}

fn check_reopen(
    accessor: &dyn SharedMemoryAccessor,
    created: &mut SharedMemoryRegion,
    args: &ShmProbeArgs,
) -> Result<()> {
    let mut opened = accessor
        .try_open(&args.name)
        .ok_or_else(|| ProbeError::OpenFailed(args.name.clone()))?;

    let result = compare(created, &opened, args);
    accessor.delete(Some(&mut opened));
    result?;

    println!("Reopened region '{}' ({} bytes)", opened.name(), opened.size());
    Ok(())
}

fn compare(
    created: &mut SharedMemoryRegion,
    opened: &SharedMemoryRegion,
    args: &ShmProbeArgs,
) -> Result<()> {
    if opened.size() != created.size() {
        return Err(ProbeError::SizeMismatch {
            name: args.name.clone(),
            created: created.size(),
            opened: opened.size(),
        }
        .into());
    }

    let len = MARKER.len().min(created.size());
    created.write_at(0, &MARKER[..len])?;
    if opened.read_at(0, len)? != MARKER[..len] {
        return Err(ProbeError::MarkerMismatch(args.name.clone()).into());
    }

    Ok(())
}
