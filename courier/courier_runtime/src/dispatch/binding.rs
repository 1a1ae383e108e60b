//! Binding resolution.
//!
//! A function's non-trigger inputs and its outputs are bound concurrently,
//! one task per binding, and joined before the invocation moves on. Every
//! binding sees the same read-only binding data and writes only its own
//! context value, so no locking is needed between them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use courier_core::error::BindingError;
use courier_core::{
    BindingDescriptor, BindingDirection, BindingValue, DataType, InvocationInput,
    InvocationResult, RETURN_BINDING_NAME,
};
use serde_json::Value;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A data binding implementation (queue, blob, HTTP, ...).
#[async_trait]
pub trait Binding: Send + Sync {
    /// Declaration this implementation serves.
    fn descriptor(&self) -> &BindingDescriptor;

    /// Bind one value.
    ///
    /// Input bindings set `ctx.value`; output bindings consume it.
    async fn bind(&self, ctx: &mut BindingContext) -> Result<(), BindingError>;
}

/// Per-binding view of an invocation.
#[derive(Debug, Clone)]
pub struct BindingContext {
    /// Binding name
    pub name: String,

    /// Declared data type
    pub data_type: DataType,

    /// Value produced (inputs) or to be written (outputs)
    pub value: BindingValue,

    binding_data: Arc<HashMap<String, Value>>,
    trigger_value: Option<Arc<BindingValue>>,
    cancellation: CancellationToken,
}

impl BindingContext {
    fn new(
        descriptor: &BindingDescriptor,
        binding_data: Arc<HashMap<String, Value>>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            name: descriptor.name.clone(),
            data_type: descriptor.data_type,
            value: BindingValue::Null,
            binding_data,
            trigger_value: None,
            cancellation,
        }
    }

    /// Binding data shared by every binding of the invocation.
    pub fn binding_data(&self) -> &HashMap<String, Value> {
        &self.binding_data
    }

    /// Look up one binding-data key.
    pub fn binding_data_value(&self, key: &str) -> Option<&Value> {
        self.binding_data.get(key)
    }

    /// The invocation's trigger value. Only set for output bindings.
    pub fn trigger_value(&self) -> Option<&BindingValue> {
        self.trigger_value.as_deref()
    }

    /// Cancellation signal of the invocation.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Runs a function's bindings concurrently.
#[derive(Clone)]
pub struct BindingResolver {
    bindings: Vec<Arc<dyn Binding>>,
}

impl BindingResolver {
    /// Create a resolver over bindings in declaration order.
    pub fn new(bindings: Vec<Arc<dyn Binding>>) -> Self {
        Self { bindings }
    }

    /// Number of bindings managed.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bind every non-trigger input.
    ///
    /// Results come back in declaration order. The first failure fails the
    /// whole batch.
    pub async fn resolve_inputs(
        &self,
        binding_data: Arc<HashMap<String, Value>>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<InvocationInput>, BindingError> {
        let work = self
            .bindings
            .iter()
            .filter(|b| {
                let direction = b.descriptor().direction;
                direction.is_input() && direction != BindingDirection::Trigger
            })
            .map(|b| {
                let ctx = BindingContext::new(
                    b.descriptor(),
                    binding_data.clone(),
                    cancellation.clone(),
                );
                (b.clone(), ctx)
            })
            .collect();

        let contexts = run_batch("input", work, cancellation).await?;
        Ok(contexts
            .into_iter()
            .map(|ctx| InvocationInput::new(ctx.name, ctx.data_type, ctx.value))
            .collect())
    }

    /// Bind every output that has a value in `result`.
    ///
    /// The return binding reads the value stored under the well-known return
    /// key. Outputs that are missing or null are skipped. Returns the names
    /// bound, in declaration order.
    pub async fn resolve_outputs(
        &self,
        trigger_value: &BindingValue,
        binding_data: Arc<HashMap<String, Value>>,
        result: &InvocationResult,
        cancellation: &CancellationToken,
    ) -> Result<Vec<String>, BindingError> {
        let trigger_value = Arc::new(trigger_value.clone());

        let work = self
            .bindings
            .iter()
            .filter(|b| b.descriptor().direction.is_output())
            .filter_map(|b| {
                let descriptor = b.descriptor();
                let key = if descriptor.direction == BindingDirection::Return {
                    RETURN_BINDING_NAME
                } else {
                    descriptor.name.as_str()
                };
                let value = result.outputs.get(key).filter(|v| !v.is_null())?;

                let mut ctx =
                    BindingContext::new(descriptor, binding_data.clone(), cancellation.clone());
                ctx.value = value.clone();
                ctx.trigger_value = Some(trigger_value.clone());
                Some((b.clone(), ctx))
            })
            .collect();

        let contexts = run_batch("output", work, cancellation).await?;
        Ok(contexts.into_iter().map(|ctx| ctx.name).collect())
    }
}

/// Run `bind` for each pair concurrently, returning contexts in input order.
async fn run_batch(
    kind: &'static str,
    work: Vec<(Arc<dyn Binding>, BindingContext)>,
    cancellation: &CancellationToken,
) -> Result<Vec<BindingContext>, BindingError> {
    let count = work.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    let batch_started = Instant::now();
    let mut tasks = JoinSet::new();

    for (index, (binding, mut ctx)) in work.into_iter().enumerate() {
        tasks.spawn(async move {
            let started = Instant::now();
            let outcome = binding.bind(&mut ctx).await;
            debug!(
                binding = %ctx.name,
                kind,
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = outcome.is_ok(),
                "Binding finished"
            );
            outcome.map(|_| (index, ctx))
        });
    }

    let mut resolved: Vec<Option<BindingContext>> = vec![None; count];

    loop {
        let joined = tokio::select! {
            _ = cancellation.cancelled() => {
                tasks.detach_all();
                return Err(BindingError::Cancelled);
            }
            joined = tasks.join_next() => joined,
        };

        let Some(joined) = joined else {
            break;
        };

        match joined {
            Ok(Ok((index, ctx))) => resolved[index] = Some(ctx),
            Ok(Err(e)) => {
                tasks.detach_all();
                return Err(e);
            }
            Err(e) => {
                tasks.detach_all();
                return Err(BindingError::TaskFailed(e.to_string()));
            }
        }
    }

    debug!(
        kind,
        count,
        elapsed_ms = batch_started.elapsed().as_millis() as u64,
        "Binding batch finished"
    );

    Ok(resolved.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct StaticInput {
        descriptor: BindingDescriptor,
        value: BindingValue,
        delay: Duration,
    }

    #[async_trait]
    impl Binding for StaticInput {
        fn descriptor(&self) -> &BindingDescriptor {
            &self.descriptor
        }

        async fn bind(&self, ctx: &mut BindingContext) -> Result<(), BindingError> {
            tokio::time::sleep(self.delay).await;
            ctx.value = self.value.clone();
            Ok(())
        }
    }

    struct FailingInput {
        descriptor: BindingDescriptor,
    }

    #[async_trait]
    impl Binding for FailingInput {
        fn descriptor(&self) -> &BindingDescriptor {
            &self.descriptor
        }

        async fn bind(&self, ctx: &mut BindingContext) -> Result<(), BindingError> {
            Err(BindingError::bind_failed(&ctx.name, "storage unavailable"))
        }
    }

    struct RecordingOutput {
        descriptor: BindingDescriptor,
        seen: Mutex<Vec<BindingValue>>,
    }

    #[async_trait]
    impl Binding for RecordingOutput {
        fn descriptor(&self) -> &BindingDescriptor {
            &self.descriptor
        }

        async fn bind(&self, ctx: &mut BindingContext) -> Result<(), BindingError> {
            assert!(ctx.trigger_value().is_some());
            self.seen.lock().push(ctx.value.clone());
            Ok(())
        }
    }

    fn input(name: &str, value: &str, delay_ms: u64) -> Arc<dyn Binding> {
        Arc::new(StaticInput {
            descriptor: BindingDescriptor::input(name),
            value: value.into(),
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[tokio::test]
    async fn test_inputs_in_declaration_order() {
        let resolver = BindingResolver::new(vec![
            input("slow", "a", 30),
            input("fast", "b", 0),
        ]);

        let inputs = resolver
            .resolve_inputs(Arc::new(HashMap::new()), &CancellationToken::new())
            .await
            .unwrap();

        let names: Vec<&str> = inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
        assert_eq!(inputs[0].value, BindingValue::from("a"));
    }

    #[tokio::test]
    async fn test_first_failure_fails_batch() {
        let resolver = BindingResolver::new(vec![
            input("ok", "a", 50),
            Arc::new(FailingInput {
                descriptor: BindingDescriptor::input("broken"),
            }) as Arc<dyn Binding>,
        ]);

        let err = resolver
            .resolve_inputs(Arc::new(HashMap::new()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BindingError::BindFailed { name, .. } if name == "broken"));
    }

    #[tokio::test]
    async fn test_cancelled_batch() {
        let resolver = BindingResolver::new(vec![input("slow", "a", 5_000)]);
        let token = CancellationToken::new();
        token.cancel();

        let err = resolver
            .resolve_inputs(Arc::new(HashMap::new()), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, BindingError::Cancelled));
    }

    #[tokio::test]
    async fn test_outputs_skip_absent_values() {
        let out = Arc::new(RecordingOutput {
            descriptor: BindingDescriptor::output("out"),
            seen: Mutex::new(Vec::new()),
        });
        let unused = Arc::new(RecordingOutput {
            descriptor: BindingDescriptor::output("unused"),
            seen: Mutex::new(Vec::new()),
        });
        let resolver =
            BindingResolver::new(vec![out.clone() as Arc<dyn Binding>, unused.clone()]);

        let result = InvocationResult::new().with_output("out", "hello");
        let bound = resolver
            .resolve_outputs(
                &BindingValue::from("trigger"),
                Arc::new(HashMap::new()),
                &result,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(bound, vec!["out".to_string()]);
        assert_eq!(*out.seen.lock(), vec![BindingValue::from("hello")]);
        assert!(unused.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_outputs_skip_null_values() {
        let out = Arc::new(RecordingOutput {
            descriptor: BindingDescriptor::output("out"),
            seen: Mutex::new(Vec::new()),
        });
        let ret = Arc::new(RecordingOutput {
            descriptor: BindingDescriptor::return_value(),
            seen: Mutex::new(Vec::new()),
        });
        let resolver = BindingResolver::new(vec![out.clone() as Arc<dyn Binding>, ret.clone()]);

        let result = InvocationResult::new()
            .with_output("out", Value::Null)
            .with_output(RETURN_BINDING_NAME, "done");
        let bound = resolver
            .resolve_outputs(
                &BindingValue::from("trigger"),
                Arc::new(HashMap::new()),
                &result,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(bound, vec![RETURN_BINDING_NAME.to_string()]);
        assert!(out.seen.lock().is_empty());
        assert_eq!(*ret.seen.lock(), vec![BindingValue::from("done")]);
    }

    #[tokio::test]
    async fn test_binding_data_is_shared() {
        struct EchoKey(BindingDescriptor);

        #[async_trait]
        impl Binding for EchoKey {
            fn descriptor(&self) -> &BindingDescriptor {
                &self.0
            }

            async fn bind(&self, ctx: &mut BindingContext) -> Result<(), BindingError> {
                ctx.value = ctx
                    .binding_data_value("id")
                    .cloned()
                    .map(BindingValue::from)
                    .unwrap_or(BindingValue::Null);
                Ok(())
            }
        }

        let resolver = BindingResolver::new(vec![
            Arc::new(EchoKey(BindingDescriptor::input("first"))) as Arc<dyn Binding>,
            Arc::new(EchoKey(BindingDescriptor::input("second"))) as Arc<dyn Binding>,
        ]);

        let mut data = HashMap::new();
        data.insert("id".to_string(), serde_json::json!(5));

        let inputs = resolver
            .resolve_inputs(Arc::new(data), &CancellationToken::new())
            .await
            .unwrap();
        assert!(inputs
            .iter()
            .all(|i| i.value == BindingValue::Json(serde_json::json!(5))));
    }
}
