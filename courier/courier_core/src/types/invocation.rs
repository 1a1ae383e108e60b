//! Invocation inputs and results exchanged with workers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::binding::DataType;
use super::value::BindingValue;

/// One resolved input: `(name, data type, value)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvocationInput {
    /// Binding name
    pub name: String,

    /// Declared data type
    pub data_type: DataType,

    /// Resolved value
    pub value: BindingValue,
}

impl InvocationInput {
    /// Create an input triple.
    pub fn new(name: impl Into<String>, data_type: DataType, value: BindingValue) -> Self {
        Self {
            name: name.into(),
            data_type,
            value,
        }
    }
}

/// What a worker reports back for a successful invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Output values keyed by binding name
    #[serde(default)]
    pub outputs: HashMap<String, BindingValue>,

    /// The function's return value
    #[serde(default)]
    pub return_value: Option<BindingValue>,
}

impl InvocationResult {
    /// An empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output value.
    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<BindingValue>) -> Self {
        self.outputs.insert(name.into(), value.into());
        self
    }

    /// Set the return value.
    pub fn with_return_value(mut self, value: impl Into<BindingValue>) -> Self {
        self.return_value = Some(value.into());
        self
    }
}

/// Failure reported by a worker when the function itself failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFailure {
    /// Error message
    pub message: String,

    /// Stack trace or exception details, if the worker sent any
    #[serde(default)]
    pub details: Option<String>,
}

impl WorkerFailure {
    /// Failure with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }
}
