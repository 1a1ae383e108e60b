//! The readiness-gated invocation dispatch path.
//!
//! This module provides the readiness gate, binding resolution, result
//! correlation and the dispatcher that composes them.

pub mod binding;
pub mod context;
pub mod dispatcher;
pub mod enrichment;
pub mod readiness;
pub mod result;
pub mod return_value;

// Re-export key types for convenience
pub use binding::{Binding, BindingContext, BindingResolver};
pub use context::{InvocationContext, InvocationRequest};
pub use dispatcher::InvocationDispatcher;
pub use readiness::{InvocationReadinessGate, WorkerPoolState};
pub use result::{InvocationOutcome, ResultSlot};
pub use return_value::ReturnValueStrategy;
