//! Shared memory regions.
//!
//! A region is a named block of OS-backed memory mapped into the host and a
//! worker process. The process that created it owns it; a process that opened
//! it by name is only attached. Releasing an attached region never removes
//! the name.

use std::fmt;
use std::ptr;

use courier_core::error::MemoryError;
use serde::{Deserialize, Serialize};
use shared_memory::Shmem;

/// Memory access permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryAccess {
    /// Read-only access.
    ReadOnly,

    /// Read-write access.
    ReadWrite,
}

/// Relationship between this process and a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ownership {
    /// This process created the region and is responsible for deleting it.
    Owner,

    /// This process opened a region created elsewhere.
    Attached,
}

/// A named shared memory region.
pub struct SharedMemoryRegion {
    name: String,
    size: usize,
    access: MemoryAccess,
    ownership: Ownership,
    handle: Option<Shmem>,
}

// SAFETY: the mapping is process-wide and stays valid for as long as the
// handle is held; the handle is only touched through `&self`/`&mut self`.
unsafe impl Send for SharedMemoryRegion {}

impl SharedMemoryRegion {
    pub(crate) fn new(name: &str, size: usize, ownership: Ownership, handle: Shmem) -> Self {
        Self {
            name: name.to_string(),
            size,
            access: MemoryAccess::ReadWrite,
            ownership,
            handle: Some(handle),
        }
    }

    /// Region name as given by the caller.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes, fixed at creation.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Access mode of the mapping.
    pub fn access(&self) -> MemoryAccess {
        self.access
    }

    /// Whether this process owns the region.
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Shorthand for `ownership() == Ownership::Owner`.
    pub fn is_owner(&self) -> bool {
        self.ownership == Ownership::Owner
    }

    /// Whether the handle has been released.
    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// Copy `bytes` into the region at `offset`.
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> Result<(), MemoryError> {
        let base = self.checked_ptr(offset, bytes.len())?;
        // SAFETY: bounds checked above and the mapping is alive while the
        // handle is held.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), base.add(offset), bytes.len()) };
        Ok(())
    }

    /// Copy `len` bytes out of the region starting at `offset`.
    pub fn read_at(&self, offset: usize, len: usize) -> Result<Vec<u8>, MemoryError> {
        let base = self.checked_ptr(offset, len)?;
        let mut out = vec![0u8; len];
        // SAFETY: bounds checked above and the mapping is alive while the
        // handle is held.
        unsafe { ptr::copy_nonoverlapping(base.add(offset), out.as_mut_ptr(), len) };
        Ok(out)
    }

    fn checked_ptr(&self, offset: usize, len: usize) -> Result<*mut u8, MemoryError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| MemoryError::Released(self.name.clone()))?;

        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(handle.as_ptr()),
            _ => Err(MemoryError::OutOfBounds {
                name: self.name.clone(),
                offset,
                len,
                size: self.size,
            }),
        }
    }

    /// Drop the OS handle. Returns `false` if it was already released.
    pub(crate) fn release(&mut self) -> bool {
        self.handle.take().is_some()
    }
}

impl fmt::Debug for SharedMemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMemoryRegion")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("access", &self.access)
            .field("ownership", &self.ownership)
            .field("released", &self.is_released())
            .finish()
    }
}
