//! Platform-abstracted access to shared memory regions.

use std::sync::Arc;

use courier_core::error::MemoryError;
use tracing::info;

use crate::region::SharedMemoryRegion;
use crate::unix::UnixSharedMemoryAccessor;
use crate::windows::WindowsSharedMemoryAccessor;

/// Create, open and delete named shared memory regions.
///
/// Implementations never panic and never return errors from these calls:
/// every failure is logged with the map name and requested size, and turned
/// into `None` so the caller can fall back to the non-shared-memory path.
pub trait SharedMemoryAccessor: Send + Sync {
    /// Name of the platform this accessor targets.
    fn platform(&self) -> &'static str;

    /// Create a new region of exactly `size` bytes, owned by this process.
    fn try_create(&self, name: &str, size: usize) -> Option<SharedMemoryRegion>;

    /// Attach read-write to a region created by another process.
    fn try_open(&self, name: &str) -> Option<SharedMemoryRegion>;

    /// Release this process's handle to the region.
    ///
    /// `None` and already-released regions are no-ops.
    fn delete(&self, region: Option<&mut SharedMemoryRegion>);
}

/// Name of the platform the process is running on, as used by accessors.
pub fn current_platform() -> &'static str {
    if cfg!(windows) {
        "windows"
    } else if cfg!(unix) {
        "unix"
    } else {
        std::env::consts::OS
    }
}

/// Select the accessor variant for the running platform.
///
/// Called once at process start; fails immediately on a platform with no
/// shared memory support.
pub fn platform_accessor() -> Result<Arc<dyn SharedMemoryAccessor>, MemoryError> {
    let accessor: Arc<dyn SharedMemoryAccessor> = if cfg!(windows) {
        Arc::new(WindowsSharedMemoryAccessor::new()?)
    } else {
        Arc::new(UnixSharedMemoryAccessor::new()?)
    };

    info!("Using {} shared memory accessor", accessor.platform());
    Ok(accessor)
}
