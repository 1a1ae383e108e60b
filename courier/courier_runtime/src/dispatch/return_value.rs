//! Return-value strategies.

use courier_core::{BindingValue, FunctionMetadata, InvocationResult, RETURN_BINDING_NAME};

/// How a function's return value reaches its outputs.
///
/// Chosen once per function when the dispatcher is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnValueStrategy {
    /// A return binding is declared: the value is stored under `$return`
    /// and bound like any other output.
    Named,

    /// No return binding: a record's top-level keys become outputs,
    /// replacing same-named outputs. Anything else is dropped.
    Structured,
}

impl ReturnValueStrategy {
    /// Pick the strategy for a function.
    pub fn for_function(function: &FunctionMetadata) -> Self {
        if function.return_binding().is_some() {
            Self::Named
        } else {
            Self::Structured
        }
    }

    /// Fold the return value into `result.outputs` and hand it back.
    pub fn apply(&self, result: &mut InvocationResult) -> Option<BindingValue> {
        let return_value = result.return_value.clone()?;

        match self {
            Self::Named => {
                result
                    .outputs
                    .insert(RETURN_BINDING_NAME.to_string(), return_value.clone());
            }
            Self::Structured => {
                if let Some(record) = return_value.as_record() {
                    for (key, value) in record {
                        result
                            .outputs
                            .insert(key.clone(), BindingValue::from(value.clone()));
                    }
                }
            }
        }

        Some(return_value)
    }
}
