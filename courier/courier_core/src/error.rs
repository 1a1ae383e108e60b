//! Error types for the Courier dispatch core.
//!
//! Errors are organized by subsystem, with each subsystem having its own
//! error type. The root error type, `Error`, can wrap any of them so that
//! callers at the edge of the system can handle failures uniformly.

use crate::id::InvocationId;
use thiserror::Error;

/// Root error type for the Courier system.
#[derive(Debug, Error)]
pub enum Error {
    /// Binding resolution errors
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    /// Invocation dispatch errors
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Function metadata errors
    #[error("Function error: {0}")]
    Function(#[from] FunctionError),

    /// Shared memory errors
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    /// Result correlation errors
    #[error("Result slot error: {0}")]
    ResultSlot(#[from] ResultSlotError),
}

/// Errors raised while resolving input or output bindings.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The binding implementation failed
    #[error("Binding '{name}' failed: {message}")]
    BindFailed {
        /// Binding name
        name: String,
        /// Failure description
        message: String,
    },

    /// A raw stream could not be converted into the declared data type
    #[error("Cannot materialize value for binding '{name}': {message}")]
    Materialization {
        /// Binding name
        name: String,
        /// Failure description
        message: String,
    },

    /// The binding task panicked or was aborted
    #[error("Binding task did not complete: {0}")]
    TaskFailed(String),

    /// The invocation was cancelled while bindings were resolving
    #[error("Binding resolution cancelled")]
    Cancelled,
}

impl BindingError {
    /// Convenience constructor for a failed bind.
    pub fn bind_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BindFailed {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Errors raised on the dispatch path of a single invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Input or output bindings failed
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// The worker channel refused the invocation
    #[error("Invocation {0} rejected by worker channel: {1}")]
    Rejected(InvocationId, String),

    /// The worker channel is gone
    #[error("Worker channel closed")]
    ChannelClosed,

    /// The function itself failed inside the worker
    #[error("Invocation {0} failed in worker: {1}")]
    WorkerFailed(InvocationId, String),

    /// The invocation was cancelled while waiting for its result
    #[error("Invocation {0} was cancelled")]
    Cancelled(InvocationId),
}

/// Errors in function metadata.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// More than one binding declared with direction `Return`
    #[error("Function '{0}' declares more than one return binding")]
    MultipleReturnBindings(String),

    /// No trigger binding, or more than one
    #[error("Function '{0}' must declare exactly one trigger binding, found {1}")]
    TriggerCount(String, usize),

    /// Two bindings share a name
    #[error("Function '{0}' declares binding '{1}' more than once")]
    DuplicateBinding(String, String),

    /// A declared binding has no implementation
    #[error("Function '{0}' has no implementation for binding '{1}'")]
    UnboundBinding(String, String),
}

/// Errors related to shared memory regions.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The accessor variant does not match the running platform
    #[error("Shared memory accessor '{expected}' cannot run on '{actual}'")]
    PlatformMismatch {
        /// Platform the accessor was built for
        expected: &'static str,
        /// Platform the process is running on
        actual: &'static str,
    },

    /// An access fell outside the region
    #[error("Access at offset {offset} with length {len} exceeds region '{name}' of {size} bytes")]
    OutOfBounds {
        /// Region name
        name: String,
        /// Requested offset
        offset: usize,
        /// Requested length
        len: usize,
        /// Region size
        size: usize,
    },

    /// The region's handle has already been released
    #[error("Shared memory region '{0}' has been released")]
    Released(String),
}

/// Errors related to result correlation.
#[derive(Debug, Error)]
pub enum ResultSlotError {
    /// The result slot was written twice
    #[error("Result for invocation {0} was already set")]
    AlreadyFulfilled(InvocationId),
}
