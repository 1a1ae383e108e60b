//! Binding declarations.
//!
//! A binding is a named, directional data-transfer contract between the
//! invocation and an external source or sink (queue, blob, HTTP, ...). The
//! host only knows the declaration; concrete implementations live elsewhere.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name under which a function's return value is exposed to output bindings.
pub const RETURN_BINDING_NAME: &str = "$return";

/// Direction of a binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingDirection {
    /// The binding that starts the invocation. Always the first input.
    Trigger,

    /// Additional input resolved before dispatch.
    In,

    /// Output applied after the worker returns.
    Out,

    /// Output that receives the function's return value.
    Return,
}

impl BindingDirection {
    /// Whether values flow into the function through this binding.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Trigger | Self::In)
    }

    /// Whether values flow out of the function through this binding.
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Out | Self::Return)
    }
}

impl fmt::Display for BindingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger => write!(f, "trigger"),
            Self::In => write!(f, "in"),
            Self::Out => write!(f, "out"),
            Self::Return => write!(f, "return"),
        }
    }
}

/// Declared data type of a binding.
///
/// `Undefined` is treated as generic text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// No explicit type; values are handled as text.
    #[default]
    Undefined,

    /// UTF-8 text.
    String,

    /// Raw bytes.
    Binary,

    /// Octet stream, delivered to the worker as bytes.
    Stream,
}

impl DataType {
    /// Whether values of this type are carried as bytes rather than text.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary | Self::Stream)
    }
}

/// How many items a binding carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// A single value.
    #[default]
    One,

    /// A batch of values.
    Many,
}

/// Declaration of a single binding on a function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDescriptor {
    /// Binding name, unique within the function.
    pub name: String,

    /// Direction of the binding.
    pub direction: BindingDirection,

    /// Declared data type.
    #[serde(default, rename = "dataType")]
    pub data_type: DataType,

    /// Declared cardinality.
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl BindingDescriptor {
    /// Create a binding with default data type and cardinality.
    pub fn new(name: impl Into<String>, direction: BindingDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            data_type: DataType::default(),
            cardinality: Cardinality::default(),
        }
    }

    /// Trigger binding.
    pub fn trigger(name: impl Into<String>) -> Self {
        Self::new(name, BindingDirection::Trigger)
    }

    /// Non-trigger input binding.
    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, BindingDirection::In)
    }

    /// Output binding.
    pub fn output(name: impl Into<String>) -> Self {
        Self::new(name, BindingDirection::Out)
    }

    /// The return binding, always named [`RETURN_BINDING_NAME`].
    pub fn return_value() -> Self {
        Self::new(RETURN_BINDING_NAME, BindingDirection::Return)
    }

    /// Set the data type.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }
}
