//! Shared memory transfer manager.
//!
//! Moves invocation payloads through shared memory when they fall inside the
//! configured size window. Each map is laid out as an 8-byte little-endian
//! content length followed by the content. Maps created for an invocation are
//! tracked so they can be freed once the invocation completes.

use std::collections::HashMap;
use std::sync::Arc;

use courier_core::InvocationId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::accessor::SharedMemoryAccessor;
use crate::region::SharedMemoryRegion;

/// Size of the content-length header at the start of every map.
pub const HEADER_BYTES: usize = 8;

const DEFAULT_MIN_TRANSFER_BYTES: usize = 1024 * 1024;
const DEFAULT_MAX_TRANSFER_BYTES: usize = i32::MAX as usize;

/// Shared memory transfer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMemoryConfig {
    /// Whether payloads may travel through shared memory at all
    #[serde(default)]
    pub enabled: bool,

    /// Smallest payload worth moving through shared memory
    #[serde(default = "default_min_transfer_bytes")]
    pub min_transfer_bytes: usize,

    /// Largest payload that may be moved through shared memory
    #[serde(default = "default_max_transfer_bytes")]
    pub max_transfer_bytes: usize,
}

fn default_min_transfer_bytes() -> usize {
    DEFAULT_MIN_TRANSFER_BYTES
}

fn default_max_transfer_bytes() -> usize {
    DEFAULT_MAX_TRANSFER_BYTES
}

impl Default for SharedMemoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_transfer_bytes: DEFAULT_MIN_TRANSFER_BYTES,
            max_transfer_bytes: DEFAULT_MAX_TRANSFER_BYTES,
        }
    }
}

/// Where a payload was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMemoryMetadata {
    /// Region name
    pub name: String,

    /// Content length in bytes
    pub count: usize,
}

/// Shared memory transfer manager.
pub struct SharedMemoryManager {
    accessor: Arc<dyn SharedMemoryAccessor>,
    config: SharedMemoryConfig,
    maps: Mutex<HashMap<String, SharedMemoryRegion>>,
    by_invocation: Mutex<HashMap<InvocationId, Vec<String>>>,
}

impl SharedMemoryManager {
    /// Create a new manager over the given accessor.
    pub fn new(accessor: Arc<dyn SharedMemoryAccessor>, config: SharedMemoryConfig) -> Self {
        Self {
            accessor,
            config,
            maps: Mutex::new(HashMap::new()),
            by_invocation: Mutex::new(HashMap::new()),
        }
    }

    /// The accessor maps are created through.
    pub fn accessor(&self) -> &Arc<dyn SharedMemoryAccessor> {
        &self.accessor
    }

    /// Whether a payload of `len` bytes should go through shared memory.
    pub fn is_supported(&self, len: usize) -> bool {
        self.config.enabled
            && len >= self.config.min_transfer_bytes
            && len <= self.config.max_transfer_bytes
    }

    /// Copy `bytes` into a fresh map tracked under `invocation_id`.
    pub fn put_bytes(
        &self,
        invocation_id: InvocationId,
        bytes: &[u8],
    ) -> Option<SharedMemoryMetadata> {
        if !self.is_supported(bytes.len()) {
            return None;
        }

        let name = format!("courier-{}", Uuid::new_v4().simple());
        let mut region = self.accessor.try_create(&name, HEADER_BYTES + bytes.len())?;

        let header = (bytes.len() as u64).to_le_bytes();
        let written = region
            .write_at(0, &header)
            .and_then(|_| region.write_at(HEADER_BYTES, bytes));
        if let Err(e) = written {
            warn!(
                map_name = %name,
                size = bytes.len(),
                "Failed to write shared memory map: {}",
                e
            );
            self.accessor.delete(Some(&mut region));
            return None;
        }

        self.maps.lock().insert(name.clone(), region);
        self.by_invocation
            .lock()
            .entry(invocation_id)
            .or_default()
            .push(name.clone());

        debug!(
            map_name = %name,
            size = bytes.len(),
            invocation_id = %invocation_id,
            "Put payload in shared memory"
        );
        Some(SharedMemoryMetadata {
            name,
            count: bytes.len(),
        })
    }

    /// Read `count` content bytes starting at `offset` from the named map.
    pub fn get_bytes(&self, name: &str, offset: usize, count: usize) -> Option<Vec<u8>> {
        let mut region = self.accessor.try_open(name)?;
        let bytes = Self::read_content(&region, offset, count);
        self.accessor.delete(Some(&mut region));
        bytes
    }

    fn read_content(region: &SharedMemoryRegion, offset: usize, count: usize) -> Option<Vec<u8>> {
        let header = region.read_at(0, HEADER_BYTES).ok()?;
        let mut raw = [0u8; HEADER_BYTES];
        raw.copy_from_slice(&header);
        let content_len = u64::from_le_bytes(raw) as usize;

        match offset.checked_add(count) {
            Some(end) if end <= content_len => {}
            _ => {
                warn!(
                    map_name = region.name(),
                    size = content_len,
                    "Requested {} bytes at offset {} past end of content",
                    count,
                    offset
                );
                return None;
            }
        }

        match region.read_at(HEADER_BYTES + offset, count) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(
                    map_name = region.name(),
                    size = region.size(),
                    "Failed to read shared memory map: {}",
                    e
                );
                None
            }
        }
    }

    /// Free every map created for `invocation_id`.
    ///
    /// Returns `false` if any tracked map was already gone.
    pub fn free_for_invocation(&self, invocation_id: &InvocationId) -> bool {
        let names = self
            .by_invocation
            .lock()
            .remove(invocation_id)
            .unwrap_or_default();
        let mut all_freed = true;
        for name in names {
            all_freed &= self.release(&name);
        }
        all_freed
    }

    /// Free one map by name.
    pub fn free_map(&self, name: &str) -> bool {
        {
            let mut by_invocation = self.by_invocation.lock();
            for names in by_invocation.values_mut() {
                names.retain(|n| n != name);
            }
            by_invocation.retain(|_, names| !names.is_empty());
        }
        self.release(name)
    }

    fn release(&self, name: &str) -> bool {
        let region = self.maps.lock().remove(name);
        match region {
            Some(mut region) => {
                self.accessor.delete(Some(&mut region));
                true
            }
            None => false,
        }
    }

    /// Number of maps currently held.
    pub fn allocated_count(&self) -> usize {
        self.maps.lock().len()
    }
}

impl Drop for SharedMemoryManager {
    fn drop(&mut self) {
        for (_, mut region) in self.maps.get_mut().drain() {
            self.accessor.delete(Some(&mut region));
        }
    }
}
