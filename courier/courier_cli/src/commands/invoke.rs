//! Single invocation against an in-process echo worker

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use courier_core::error::BindingError;
use courier_core::{BindingDescriptor, BindingValue, FunctionMetadata, InvocationResult, WorkerId};
use courier_runtime::dispatch::{Binding, BindingContext, InvocationRequest};
use courier_runtime::system::logging::init_logging;
use courier_runtime::system::HostConfig;
use courier_runtime::Host;
use tracing::info;

const TRIGGER_BINDING: &str = "msg";

/// Arguments for the invoke command
#[derive(Args)]
pub struct InvokeArgs {
    /// Trigger value; parsed as JSON when possible, otherwise used as text
    #[clap(long)]
    pub trigger: String,

    /// Path to the host configuration file
    #[clap(long)]
    pub config: Option<String>,
}

/// Receives the function's return value.
struct ReturnSink {
    descriptor: BindingDescriptor,
}

#[async_trait]
impl Binding for ReturnSink {
    fn descriptor(&self) -> &BindingDescriptor {
        &self.descriptor
    }

    async fn bind(&self, ctx: &mut BindingContext) -> Result<(), BindingError> {
        info!("Return binding received {}", ctx.value.to_json());
        Ok(())
    }
}

fn echo_function() -> FunctionMetadata {
    FunctionMetadata::new(
        "echo",
        "in-process",
        vec![
            BindingDescriptor::trigger(TRIGGER_BINDING),
            BindingDescriptor::return_value(),
        ],
    )
}

fn parse_trigger(raw: &str) -> BindingValue {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(BindingValue::from)
        .unwrap_or_else(|_| BindingValue::from(raw))
}

/// Start a host, run one invocation, and print its return value as JSON.
pub async fn execute(args: &InvokeArgs) -> Result<()> {
    let config = HostConfig::load(args.config.as_deref()).await?;
    init_logging(&config.logging);

    let expected_workers = config.expected_workers;
    let host = Host::from_config(config)?;
    host.start().await?;

    let (channel, inbox) = host.queued_channel(16);
    let worker = inbox.spawn(|item| async move {
        let value = item
            .input_value(TRIGGER_BINDING)
            .unwrap_or(BindingValue::Null);
        Ok(InvocationResult::new().with_return_value(value))
    });
    for _ in 0..expected_workers {
        host.workers.worker_ready(WorkerId::new());
    }

    let sink: Arc<dyn Binding> = Arc::new(ReturnSink {
        descriptor: BindingDescriptor::return_value(),
    });
    let dispatcher = host.dispatcher(echo_function(), vec![sink], Arc::new(channel))?;

    let outcome = dispatcher
        .invoke(InvocationRequest::new(parse_trigger(&args.trigger)))
        .await
        .context("Invocation failed");

    drop(dispatcher);
    worker.await.context("Echo worker stopped unexpectedly")?;
    host.shutdown().await?;

    let value = outcome?.map(|v| v.to_json()).unwrap_or_default();
    println!("{}", serde_json::to_string(&value)?);

    Ok(())
}
