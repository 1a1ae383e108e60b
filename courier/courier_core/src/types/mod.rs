//! Core data types for Courier.
//!
//! This module defines the data model shared by the dispatch path and the
//! shared-memory layer: binding declarations, function metadata, binding
//! values, invocation results, readiness state and trace propagation.

pub mod binding;
pub mod function;
pub mod invocation;
pub mod readiness;
pub mod trace;
pub mod value;

pub use binding::{
    BindingDescriptor, BindingDirection, Cardinality, DataType, RETURN_BINDING_NAME,
};
pub use function::FunctionMetadata;
pub use invocation::{InvocationInput, InvocationResult, WorkerFailure};
pub use readiness::DispatcherReadinessState;
pub use trace::TraceContext;
pub use value::BindingValue;
