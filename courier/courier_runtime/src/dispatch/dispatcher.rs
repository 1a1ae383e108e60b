//! Invocation dispatcher
//!
//! Orchestrates one invocation end to end:
//!
//! 1. gate on worker-pool readiness, escalating to host shutdown when the
//!    pool never becomes ready;
//! 2. materialize the trigger value and enrich binding data from it;
//! 3. resolve the other inputs concurrently;
//! 4. assemble the invocation context;
//! 5. submit it to the worker channel and wait for its result slot;
//! 6. apply the return-value strategy and resolve outputs;
//! 7. hand the return value back.

use std::collections::HashMap;
use std::sync::Arc;

use courier_core::error::{DispatchError, FunctionError};
use courier_core::{
    BindingDescriptor, BindingDirection, BindingValue, FunctionMetadata, InvocationId,
    InvocationInput, TraceContext,
};
use courier_memory::SharedMemoryManager;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::binding::{Binding, BindingResolver};
use super::context::{InvocationContext, InvocationRequest};
use super::enrichment::enrich_binding_data;
use super::readiness::InvocationReadinessGate;
use super::return_value::ReturnValueStrategy;
use crate::system::shutdown::ApplicationLifetime;
use crate::worker::channel::InvocationChannel;

/// Dispatches invocations of one function to its worker channel.
pub struct InvocationDispatcher {
    function: Arc<FunctionMetadata>,
    trigger: BindingDescriptor,
    input_count: usize,
    resolver: BindingResolver,
    strategy: ReturnValueStrategy,
    gate: InvocationReadinessGate,
    lifetime: Arc<dyn ApplicationLifetime>,
    channel: Arc<dyn InvocationChannel>,
    shared_memory: Option<Arc<SharedMemoryManager>>,
}

impl InvocationDispatcher {
    /// Create a dispatcher for `function`.
    ///
    /// Every declared binding except the trigger needs an implementation in
    /// `bindings`. Fails if the metadata is invalid.
    pub fn new(
        function: FunctionMetadata,
        bindings: Vec<Arc<dyn Binding>>,
        gate: InvocationReadinessGate,
        lifetime: Arc<dyn ApplicationLifetime>,
        channel: Arc<dyn InvocationChannel>,
    ) -> Result<Self, FunctionError> {
        function.validate()?;

        let trigger = function
            .trigger()
            .cloned()
            .ok_or_else(|| FunctionError::TriggerCount(function.name.clone(), 0))?;

        let mut by_name: HashMap<String, Arc<dyn Binding>> = bindings
            .into_iter()
            .map(|b| (b.descriptor().name.clone(), b))
            .collect();

        let mut ordered = Vec::new();
        for descriptor in &function.bindings {
            if descriptor.direction == BindingDirection::Trigger {
                by_name.remove(&descriptor.name);
                continue;
            }
            match by_name.remove(&descriptor.name) {
                Some(binding) => ordered.push(binding),
                None => {
                    return Err(FunctionError::UnboundBinding(
                        function.name.clone(),
                        descriptor.name.clone(),
                    ))
                }
            }
        }

        for name in by_name.keys() {
            warn!(
                "Binding '{}' is not declared by function '{}' and will be ignored",
                name, function.name
            );
        }

        let strategy = ReturnValueStrategy::for_function(&function);
        let input_count = function.inputs().count();

        debug!(
            "Dispatcher for '{}' uses {:?} return strategy with {} bindings",
            function.name,
            strategy,
            ordered.len()
        );

        Ok(Self {
            function: Arc::new(function),
            trigger,
            input_count,
            resolver: BindingResolver::new(ordered),
            strategy,
            gate,
            lifetime,
            channel,
            shared_memory: None,
        })
    }

    /// Free shared memory maps of each invocation once it completes.
    pub fn with_shared_memory(mut self, manager: Arc<SharedMemoryManager>) -> Self {
        self.shared_memory = Some(manager);
        self
    }

    /// Function this dispatcher serves.
    pub fn function(&self) -> &FunctionMetadata {
        &self.function
    }

    /// Return-value strategy chosen for the function.
    pub fn strategy(&self) -> ReturnValueStrategy {
        self.strategy
    }

    /// Run one invocation and return its return value.
    pub async fn invoke(
        &self,
        request: InvocationRequest,
    ) -> Result<Option<BindingValue>, DispatchError> {
        let invocation_id = InvocationId::new();
        let span = info_span!(
            "invocation",
            invocation_id = %invocation_id,
            function = %self.function.name
        );

        async move {
            let outcome = self.dispatch(invocation_id, request).await;

            if let Some(manager) = &self.shared_memory {
                manager.free_for_invocation(&invocation_id);
            }

            match &outcome {
                Ok(_) => info!("Invocation completed"),
                Err(e) => warn!("Invocation failed: {}", e),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn dispatch(
        &self,
        invocation_id: InvocationId,
        request: InvocationRequest,
    ) -> Result<Option<BindingValue>, DispatchError> {
        let InvocationRequest {
            trigger_value,
            mut binding_data,
            trace_context,
            cancellation,
        } = request;
        let cancellation = cancellation.unwrap_or_default();

        self.await_readiness(&cancellation).await;

        let trigger_value =
            trigger_value.materialize(self.trigger.data_type, &self.trigger.name)?;
        let added = enrich_binding_data(&mut binding_data, &trigger_value);
        if added > 0 {
            debug!("Added {} binding data keys from trigger value", added);
        }
        let binding_data = Arc::new(binding_data);

        let mut inputs = vec![InvocationInput::new(
            self.trigger.name.clone(),
            self.trigger.data_type,
            trigger_value.clone(),
        )];
        if self.input_count > 1 {
            inputs.extend(
                self.resolver
                    .resolve_inputs(binding_data.clone(), &cancellation)
                    .await?,
            );
        }

        let trace_context = trace_context
            .map(|parent| parent.child())
            .unwrap_or_else(TraceContext::new_root);

        let context = Arc::new(InvocationContext::new(
            invocation_id,
            self.function.clone(),
            binding_data,
            inputs,
            trace_context,
            cancellation.clone(),
        ));

        self.channel.submit(context.clone()).await?;
        debug!("Invocation submitted to worker channel");

        let outcome = tokio::select! {
            _ = cancellation.cancelled() => {
                return Err(DispatchError::Cancelled(invocation_id));
            }
            outcome = context.result_slot().wait() => outcome,
        };

        let mut result =
            outcome.map_err(|failure| DispatchError::WorkerFailed(invocation_id, failure.message))?;

        let return_value = self.strategy.apply(&mut result);

        let bound = self
            .resolver
            .resolve_outputs(
                &trigger_value,
                context.shared_binding_data(),
                &result,
                &cancellation,
            )
            .await?;
        debug!("Bound {} outputs", bound.len());

        Ok(return_value)
    }

    /// Wait for the worker pool when it is not ready yet.
    ///
    /// A timed-out wait stops the host; the invocation carries on and fails
    /// naturally if no worker ever takes it.
    async fn await_readiness(&self, cancellation: &CancellationToken) {
        if self.gate.is_ready() {
            return;
        }

        if self.gate.await_ready_or_timeout(cancellation).await {
            error!(
                state = %self.gate.state(),
                "Worker pool did not become ready within {:?}, stopping host",
                self.gate.wait_bound()
            );
            self.lifetime.stop_application();
        }
    }
}
