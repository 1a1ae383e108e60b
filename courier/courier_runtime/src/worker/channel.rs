//! Worker channels
//!
//! The dispatcher hands each [`InvocationContext`] to an
//! [`InvocationChannel`] and waits on the context's result slot. The channel
//! guarantees the slot is fulfilled at most once.
//!
//! [`QueuedInvocationChannel`] is an in-process channel backed by a tokio
//! queue. Large byte inputs can be moved through shared memory on the way.
//! Its [`WorkerInbox`] can take part in host drain: once drain is requested
//! it refuses new submissions, finishes what is queued and in flight, then
//! reports drained.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use courier_core::error::{DispatchError, ResultSlotError};
use courier_core::BindingValue;
use courier_memory::{SharedMemoryManager, SharedMemoryMetadata};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::dispatch::context::InvocationContext;
use crate::dispatch::result::InvocationOutcome;
use crate::system::DrainHandle;

/// Channel to a language worker.
#[async_trait]
pub trait InvocationChannel: Send + Sync {
    /// Hand an invocation to a worker.
    ///
    /// Returning `Ok` means the worker side now owns fulfilling the result
    /// slot.
    async fn submit(&self, context: Arc<InvocationContext>) -> Result<(), DispatchError>;
}

/// One queued invocation as seen by the worker.
pub struct WorkItem {
    context: Arc<InvocationContext>,
    transfers: HashMap<String, SharedMemoryMetadata>,
    shared_memory: Option<Arc<SharedMemoryManager>>,
}

impl WorkItem {
    /// The invocation.
    pub fn context(&self) -> &InvocationContext {
        &self.context
    }

    /// Inputs that were moved through shared memory.
    pub fn transfers(&self) -> &HashMap<String, SharedMemoryMetadata> {
        &self.transfers
    }

    /// Value of an input, read back from shared memory when it was moved there.
    pub fn input_value(&self, name: &str) -> Option<BindingValue> {
        if let (Some(meta), Some(manager)) = (self.transfers.get(name), &self.shared_memory) {
            match manager.get_bytes(&meta.name, 0, meta.count) {
                Some(bytes) => return Some(BindingValue::Bytes(bytes)),
                None => warn!(
                    invocation_id = %self.context.invocation_id(),
                    "Shared memory input '{}' unavailable, using channel copy",
                    name
                ),
            }
        }

        self.context.input(name).map(|input| input.value.clone())
    }

    /// Fulfill the invocation's result slot.
    pub fn complete(&self, outcome: InvocationOutcome) -> Result<(), ResultSlotError> {
        self.context.result_slot().fulfill(outcome)
    }
}

/// In-process channel backed by a bounded queue.
#[derive(Clone)]
pub struct QueuedInvocationChannel {
    sender: mpsc::Sender<WorkItem>,
    shared_memory: Option<Arc<SharedMemoryManager>>,
}

impl QueuedInvocationChannel {
    /// Create a channel and the inbox its worker reads from.
    pub fn new(capacity: usize) -> (Self, WorkerInbox) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                shared_memory: None,
            },
            WorkerInbox {
                receiver,
                drain: None,
            },
        )
    }

    /// Move large byte inputs through shared memory.
    pub fn with_shared_memory(mut self, manager: Arc<SharedMemoryManager>) -> Self {
        self.shared_memory = Some(manager);
        self
    }

    fn transfer_inputs(
        &self,
        context: &InvocationContext,
    ) -> HashMap<String, SharedMemoryMetadata> {
        let mut transfers = HashMap::new();
        let Some(manager) = &self.shared_memory else {
            return transfers;
        };

        let invocation_id = context.invocation_id();
        for input in context.inputs() {
            let bytes = match &input.value {
                BindingValue::Bytes(bytes) | BindingValue::Stream(bytes) => bytes,
                _ => continue,
            };
            if !manager.is_supported(bytes.len()) {
                continue;
            }
            if let Some(meta) = manager.put_bytes(invocation_id, bytes) {
                debug!(
                    invocation_id = %invocation_id,
                    map_name = %meta.name,
                    size = meta.count,
                    "Input '{}' moved to shared memory",
                    input.name
                );
                transfers.insert(input.name.clone(), meta);
            }
        }
        transfers
    }
}

#[async_trait]
impl InvocationChannel for QueuedInvocationChannel {
    async fn submit(&self, context: Arc<InvocationContext>) -> Result<(), DispatchError> {
        let transfers = self.transfer_inputs(&context);
        let item = WorkItem {
            context,
            transfers,
            shared_memory: self.shared_memory.clone(),
        };

        self.sender
            .send(item)
            .await
            .map_err(|_| DispatchError::ChannelClosed)
    }
}

/// Receiving end of a [`QueuedInvocationChannel`].
pub struct WorkerInbox {
    receiver: mpsc::Receiver<WorkItem>,
    drain: Option<DrainHandle>,
}

impl WorkerInbox {
    /// Take part in host drain through `handle`.
    pub fn drain_on(mut self, handle: DrainHandle) -> Self {
        self.drain = Some(handle);
        self
    }

    /// Next queued invocation, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<WorkItem> {
        self.receiver.recv().await
    }

    /// Run `handler` for each queued invocation on its own task.
    ///
    /// Invocations may complete in any order. The returned task ends once
    /// every sender is gone, or drain was requested, and all started
    /// invocations have completed.
    pub fn spawn<F, Fut>(self, handler: F) -> JoinHandle<()>
    where
        F: Fn(Arc<WorkItem>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = InvocationOutcome> + Send + 'static,
    {
        let Self {
            mut receiver,
            mut drain,
        } = self;
        let handler = Arc::new(handler);

        tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            let mut draining = false;

            loop {
                tokio::select! {
                    item = receiver.recv() => {
                        let Some(item) = item else { break };
                        let handler = handler.clone();
                        in_flight.spawn(async move {
                            let item = Arc::new(item);
                            let outcome = handler(item.clone()).await;
                            if let Err(e) = item.complete(outcome) {
                                warn!("Dropping duplicate worker result: {}", e);
                            }
                        });
                    }
                    _ = drain_signal(&mut drain), if !draining => {
                        debug!("Drain requested, refusing new invocations");
                        draining = true;
                        receiver.close();
                    }
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                }
            }

            while in_flight.join_next().await.is_some() {}
            debug!(draining, "Worker inbox closed");
            if let Some(handle) = drain {
                handle.drained();
            }
        })
    }
}

async fn drain_signal(drain: &mut Option<DrainHandle>) {
    match drain {
        Some(handle) => handle.drain_requested().await,
        None => std::future::pending().await,
    }
}
