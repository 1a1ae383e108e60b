//! POSIX shared memory accessor.
//!
//! Regions live in the `shm_open` namespace. Deleting an owned region unlinks
//! its name immediately, so the name can be reused; mappings already held by
//! attached processes stay valid until they unmap.

use courier_core::error::MemoryError;
use shared_memory::ShmemConf;
use tracing::{debug, error, warn};

use crate::accessor::{current_platform, SharedMemoryAccessor};
use crate::region::{Ownership, SharedMemoryRegion};

const PLATFORM: &str = "unix";

/// Accessor for Unix-like hosts.
#[derive(Debug)]
pub struct UnixSharedMemoryAccessor {
    _private: (),
}

impl UnixSharedMemoryAccessor {
    /// Create a new accessor, failing on non-Unix hosts.
    pub fn new() -> Result<Self, MemoryError> {
        if !cfg!(unix) {
            return Err(MemoryError::PlatformMismatch {
                expected: PLATFORM,
                actual: current_platform(),
            });
        }
        Ok(Self { _private: () })
    }

    fn os_id(name: &str) -> String {
        if name.starts_with('/') {
            name.to_string()
        } else {
            format!("/{}", name)
        }
    }
}

impl SharedMemoryAccessor for UnixSharedMemoryAccessor {
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
                debug!(map_name = name, size, "Created shared memory region");
                Some(SharedMemoryRegion::new(name, size, Ownership::Owner, shmem))
            }
            Err(e) => {
                error!(map_name = name, size, "Failed to create shared memory region: {}", e);
                None
            }
        }
    }

    fn try_open(&self, name: &str) -> Option<SharedMemoryRegion> {
        match ShmemConf::new().os_id(Self::os_id(name)).open() {
            Ok(mut shmem) => {
                shmem.set_owner(false);
                let size = shmem.len();
                debug!(map_name = name, size, "Opened shared memory region");
                Some(SharedMemoryRegion::new(name, size, Ownership::Attached, shmem))
            }
            Err(e) => {
                warn!(map_name = name, size = 0usize, "Failed to open shared memory region: {}", e);
                None
            }
        }
    }

    fn delete(&self, region: Option<&mut SharedMemoryRegion>) {
        let Some(region) = region else {
            return;
        };

        // Dropping an owned handle unlinks the name; an attached handle only unmaps.
        if region.release() {
            debug!(
                map_name = region.name(),
                size = region.size(),
                owner = region.is_owner(),
                "Released shared memory region"
            );
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn unique_name() -> String {
        format!("courier-unix-{}", uuid::Uuid::new_v4().simple())
    }

    #[test]
    fn test_os_id_normalisation() {
        assert_eq!(UnixSharedMemoryAccessor::os_id("abc"), "/abc");
        assert_eq!(UnixSharedMemoryAccessor::os_id("/abc"), "/abc");
    }

    #[test]
    fn test_zero_size_rejected() {
        let accessor = UnixSharedMemoryAccessor::new().unwrap();
        assert!(accessor.try_create(&unique_name(), 0).is_none());
    }

    #[test]
    fn test_open_missing_region() {
        let accessor = UnixSharedMemoryAccessor::new().unwrap();
        assert!(accessor.try_open(&unique_name()).is_none());
    }

    #[test]
    fn test_owner_delete_frees_name() {
        let accessor = UnixSharedMemoryAccessor::new().unwrap();
        let name = unique_name();

        let mut first = accessor.try_create(&name, 64).unwrap();
        accessor.delete(Some(&mut first));

        let mut second = accessor.try_create(&name, 64).unwrap();
        assert!(second.is_owner());
        accessor.delete(Some(&mut second));
    }

    #[test]
    fn test_attached_delete_keeps_region() {
        let accessor = UnixSharedMemoryAccessor::new().unwrap();
        let name = unique_name();

        let mut owner = accessor.try_create(&name, 32).unwrap();
        owner.write_at(0, b"still here").unwrap();

        let mut attached = accessor.try_open(&name).unwrap();
        assert!(!attached.is_owner());
        accessor.delete(Some(&mut attached));

        assert_eq!(owner.read_at(0, 10).unwrap(), b"still here");
        let mut again = accessor.try_open(&name).unwrap();
        accessor.delete(Some(&mut again));
        accessor.delete(Some(&mut owner));
    }
}
