//! # Courier Core
//!
//! `courier_core` provides the fundamental building blocks for the Courier
//! function-host dispatch core. This includes error types, ID definitions and
//! the data model shared by the shared-memory and runtime crates.
//!
//! ## Core Principles
//!
//! 1. **Out-of-process workers**: Function code runs in language workers that
//!    live in other processes. The host only routes invocations to them and
//!    correlates the results that come back.
//!
//! 2. **Readiness before dispatch**: An invocation is only handed to the worker
//!    pool once the pool reports that it can accept work, and the host bounds
//!    how long it is willing to wait for that.
//!
//! 3. **Directional bindings**: Every function declares named bindings with a
//!    direction (trigger, input, output, return) that move data between the
//!    invocation and external sources or sinks.
//!
//! 4. **Shared memory for large payloads**: Large values can be exchanged via
//!    named shared-memory regions instead of being copied through the channel.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all Courier components
//! - **id**: Strongly-typed identifier types
//! - **types**: Data structures used throughout the system
//! - **utils**: Logging helpers

pub mod error;
pub mod id;
pub mod types;
pub mod utils;

// Re-export key types for convenience
pub use error::Error;
pub use id::{FunctionId, InvocationId, WorkerId};
pub use types::{
    BindingDescriptor, BindingDirection, BindingValue, Cardinality, DataType,
    DispatcherReadinessState, FunctionMetadata, InvocationInput, InvocationResult, TraceContext,
    WorkerFailure, RETURN_BINDING_NAME,
};
pub use utils::LogLevel;
