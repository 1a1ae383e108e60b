//! Result correlation for dispatched invocations.

use courier_core::error::ResultSlotError;
use courier_core::{InvocationId, InvocationResult, WorkerFailure};
use tokio::sync::{Notify, OnceCell};
use tracing::error;

/// What a worker reports for one invocation.
pub type InvocationOutcome = Result<InvocationResult, WorkerFailure>;

/// Single-assignment cell a worker channel fulfills exactly once.
///
/// The slot is either empty or fulfilled. Readers suspend until the first
/// write; any later write is rejected and leaves the stored outcome intact.
#[derive(Debug)]
pub struct ResultSlot {
    invocation_id: InvocationId,
    outcome: OnceCell<InvocationOutcome>,
    notify: Notify,
}

impl ResultSlot {
    /// Create an empty slot for `invocation_id`.
    pub fn new(invocation_id: InvocationId) -> Self {
        Self {
            invocation_id,
            outcome: OnceCell::new(),
            notify: Notify::new(),
        }
    }

    /// Invocation this slot belongs to.
    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// Store the outcome and wake every reader.
    pub fn fulfill(&self, outcome: InvocationOutcome) -> Result<(), ResultSlotError> {
        if self.outcome.set(outcome).is_err() {
            error!(invocation_id = %self.invocation_id, "Result slot fulfilled more than once");
            return Err(ResultSlotError::AlreadyFulfilled(self.invocation_id));
        }

        self.notify.notify_waiters();
        Ok(())
    }

    /// Whether an outcome has been stored.
    pub fn is_fulfilled(&self) -> bool {
        self.outcome.initialized()
    }

    /// The outcome, if already stored.
    pub fn try_get(&self) -> Option<&InvocationOutcome> {
        self.outcome.get()
    }

    /// Suspend until the slot is fulfilled.
    pub async fn wait(&self) -> InvocationOutcome {
        loop {
            let notified = self.notify.notified();
            if let Some(outcome) = self.outcome.get() {
                return outcome.clone();
            }
            notified.await;
        }
    }
}
