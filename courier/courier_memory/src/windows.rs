//! Windows shared memory accessor.
//!
//! Regions are named file mappings. The mapping stays alive until the last
//! handle to it closes, so an owner's delete makes the name reusable only
//! after every attached process has released its handle too. Handles are
//! shared with workers by name rather than by inheritance.

use courier_core::error::MemoryError;
use shared_memory::ShmemConf;
use tracing::{debug, error, warn};

use crate::accessor::{current_platform, SharedMemoryAccessor};
use crate::region::{Ownership, SharedMemoryRegion};

const PLATFORM: &str = "windows";

/// Accessor for Windows hosts.
#[derive(Debug)]
pub struct WindowsSharedMemoryAccessor {
    _private: (),
}

impl WindowsSharedMemoryAccessor {
    /// Create a new accessor, failing on non-Windows hosts.
    pub fn new() -> Result<Self, MemoryError> {
        if !cfg!(windows) {
            return Err(MemoryError::PlatformMismatch {
                expected: PLATFORM,
                actual: current_platform(),
            });
        }
        Ok(Self { _private: () })
    }

    fn os_id(name: &str) -> String {
        name.trim_start_matches('/').replace('\\', "_")
    }
}

impl SharedMemoryAccessor for WindowsSharedMemoryAccessor {
    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn try_create(&self, name: &str, size: usize) -> Option<SharedMemoryRegion> {
        if size == 0 {
            warn!(map_name = name, size, "Cannot create an empty shared memory region");
            return None;
        }

        match ShmemConf::new().os_id(Self::os_id(name)).size(size).create() {
            Ok(mut shmem) => {
                shmem.set_owner(true);
                debug!(map_name = name, size, "Created file mapping");
                Some(SharedMemoryRegion::new(name, size, Ownership::Owner, shmem))
            }
            Err(e) => {
                error!(map_name = name, size, "Failed to create file mapping: {}", e);
                None
            }
        }
    }

    fn try_open(&self, name: &str) -> Option<SharedMemoryRegion> {
        match ShmemConf::new().os_id(Self::os_id(name)).open() {
            Ok(mut shmem) => {
                shmem.set_owner(false);
                let size = shmem.len();
                debug!(map_name = name, size, "Opened file mapping");
                Some(SharedMemoryRegion::new(name, size, Ownership::Attached, shmem))
            }
            Err(e) => {
                warn!(map_name = name, size = 0usize, "Failed to open file mapping: {}", e);
                None
            }
        }
    }

    fn delete(&self, region: Option<&mut SharedMemoryRegion>) {
        if let Some(region) = region {
            if region.release() {
                debug!(
                    map_name = region.name(),
                    size = region.size(),
                    owner = region.is_owner(),
                    "Closed file mapping handle"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_id_strips_separators() {
        assert_eq!(WindowsSharedMemoryAccessor::os_id("/abc"), "abc");
        assert_eq!(WindowsSharedMemoryAccessor::os_id("a\\b"), "a_b");
    }

    #[cfg(windows)]
    #[test]
    fn test_create_open_delete() {
        let accessor = WindowsSharedMemoryAccessor::new().unwrap();
        let name = format!("courier-win-{}", uuid::Uuid::new_v4().simple());

        let mut owner = accessor.try_create(&name, 128).unwrap();
        let mut attached = accessor.try_open(&name).unwrap();
        assert_eq!(attached.size(), 128);

        accessor.delete(Some(&mut attached));
        accessor.delete(Some(&mut owner));
        accessor.delete(Some(&mut owner));
    }
}
