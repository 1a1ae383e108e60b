//! Invocation requests and the context handed to a worker channel.

use std::collections::HashMap;
use std::sync::Arc;

use courier_core::{BindingValue, FunctionMetadata, InvocationId, InvocationInput, TraceContext};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::result::ResultSlot;

/// An incoming invocation, as received from the host pipeline.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Raw trigger value
    pub trigger_value: BindingValue,

    /// Binding data set explicitly by the trigger source
    pub binding_data: HashMap<String, Value>,

    /// Propagated trace context, if any
    pub trace_context: Option<TraceContext>,

    /// Cancellation signal; never cancelled when absent
    pub cancellation: Option<CancellationToken>,
}

impl InvocationRequest {
    /// Create a request for a trigger value.
    pub fn new(trigger_value: impl Into<BindingValue>) -> Self {
        Self {
            trigger_value: trigger_value.into(),
            binding_data: HashMap::new(),
            trace_context: None,
            cancellation: None,
        }
    }

    /// Set one binding-data key.
    pub fn with_binding_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.binding_data.insert(key.into(), value.into());
        self
    }

    /// Propagate a trace context.
    pub fn with_trace_context(mut self, trace_context: TraceContext) -> Self {
        self.trace_context = Some(trace_context);
        self
    }

    /// Attach a cancellation signal.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

/// Everything a worker needs to run one invocation.
///
/// Built once per dispatch and shared read-only with the channel; only the
/// result slot is written afterwards.
#[derive(Debug)]
pub struct InvocationContext {
    invocation_id: InvocationId,
    function: Arc<FunctionMetadata>,
    binding_data: Arc<HashMap<String, Value>>,
    inputs: Vec<InvocationInput>,
    trace_context: TraceContext,
    cancellation: CancellationToken,
    result_slot: ResultSlot,
}

impl InvocationContext {
    /// Assemble a context with an empty result slot.
    pub fn new(
        invocation_id: InvocationId,
        function: Arc<FunctionMetadata>,
        binding_data: Arc<HashMap<String, Value>>,
        inputs: Vec<InvocationInput>,
        trace_context: TraceContext,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            invocation_id,
            function,
            binding_data,
            inputs,
            trace_context,
            cancellation,
            result_slot: ResultSlot::new(invocation_id),
        }
    }

    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    pub fn function(&self) -> &FunctionMetadata {
        &self.function
    }

    pub fn binding_data(&self) -> &HashMap<String, Value> {
        &self.binding_data
    }

    pub(crate) fn shared_binding_data(&self) -> Arc<HashMap<String, Value>> {
        self.binding_data.clone()
    }

    /// Inputs with the trigger first, then the other inputs in declaration order.
    pub fn inputs(&self) -> &[InvocationInput] {
        &self.inputs
    }

    /// The trigger input.
    pub fn trigger_input(&self) -> Option<&InvocationInput> {
        self.inputs.first()
    }

    /// Look up an input by binding name.
    pub fn input(&self, name: &str) -> Option<&InvocationInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn trace_context(&self) -> &TraceContext {
        &self.trace_context
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Slot the channel fulfills with the worker's outcome.
    pub fn result_slot(&self) -> &ResultSlot {
        &self.result_slot
    }
}
