//! Function metadata.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::binding::{BindingDescriptor, BindingDirection};
use crate::error::FunctionError;
use crate::id::FunctionId;

/// Immutable description of a function as seen by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// Unique function ID
    #[serde(default)]
    pub id: FunctionId,

    /// Function name
    pub name: String,

    /// Language of the worker that runs this function
    #[serde(default)]
    pub language: String,

    /// Bindings in declaration order
    pub bindings: Vec<BindingDescriptor>,
}

impl FunctionMetadata {
    /// Create metadata for a function.
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        bindings: Vec<BindingDescriptor>,
    ) -> Self {
        Self {
            id: FunctionId::new(),
            name: name.into(),
            language: language.into(),
            bindings,
        }
    }

    /// Check the binding declarations.
    ///
    /// A function needs exactly one trigger, unique binding names and at most
    /// one return binding.
    pub fn validate(&self) -> Result<(), FunctionError> {
        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if !seen.insert(binding.name.as_str()) {
                return Err(FunctionError::DuplicateBinding(
                    self.name.clone(),
                    binding.name.clone(),
                ));
            }
        }

        let triggers = self
            .bindings
            .iter()
            .filter(|b| b.direction == BindingDirection::Trigger)
            .count();
        if triggers != 1 {
            return Err(FunctionError::TriggerCount(self.name.clone(), triggers));
        }

        let returns = self
            .bindings
            .iter()
            .filter(|b| b.direction == BindingDirection::Return)
            .count();
        if returns > 1 {
            return Err(FunctionError::MultipleReturnBindings(self.name.clone()));
        }

        Ok(())
    }

    /// The trigger binding, if declared.
    pub fn trigger(&self) -> Option<&BindingDescriptor> {
        self.bindings
            .iter()
            .find(|b| b.direction == BindingDirection::Trigger)
    }

    /// All input bindings (trigger included) in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &BindingDescriptor> {
        self.bindings.iter().filter(|b| b.direction.is_input())
    }

    /// The binding marked as receiving the return value.
    pub fn return_binding(&self) -> Option<&BindingDescriptor> {
        self.bindings
            .iter()
            .find(|b| b.direction == BindingDirection::Return)
    }
}
