//! # Courier Memory
//!
//! `courier_memory` exchanges large invocation payloads between the host and
//! its language workers through named shared-memory regions, so the values do
//! not have to be copied through the worker channel.
//!
//! Key concepts:
//!
//! 1. **Region**: A named block of memory mapped into two processes. The
//!    creator owns it; openers only attach.
//!
//! 2. **Accessor**: Platform-specific create/open/delete over regions. One
//!    variant is selected per process by [`platform_accessor`].
//!
//! 3. **Manager**: Transfer policy on top of the accessor: size thresholds,
//!    the content-length header, and per-invocation bookkeeping.

pub mod accessor;
pub mod manager;
pub mod region;
pub mod unix;
pub mod windows;

pub use accessor::{current_platform, platform_accessor, SharedMemoryAccessor};
pub use manager::{SharedMemoryConfig, SharedMemoryManager, SharedMemoryMetadata, HEADER_BYTES};
pub use region::{MemoryAccess, Ownership, SharedMemoryRegion};
pub use unix::UnixSharedMemoryAccessor;
pub use windows::WindowsSharedMemoryAccessor;
