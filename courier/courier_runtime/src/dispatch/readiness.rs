//! Invocation readiness gate.
//!
//! Decides whether an invocation may be dispatched now and, when it may not,
//! waits a bounded time for the worker pool to finish initializing. The wait
//! samples the pool state at a fixed interval; the state itself is owned by
//! the worker-pool manager and is only read here.

use std::sync::Arc;
use std::time::Duration;

use courier_core::DispatcherReadinessState;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::system::config::ReadinessSettings;

/// Read-only view of the worker pool the gate reacts to.
pub trait WorkerPoolState: Send + Sync {
    /// Current readiness state.
    fn readiness_state(&self) -> DispatcherReadinessState;

    /// Worker error events tolerated before the pool gives up.
    fn error_events_threshold(&self) -> u32;
}

/// Readiness gate in front of the dispatch path.
#[derive(Clone)]
pub struct InvocationReadinessGate {
    pool: Arc<dyn WorkerPoolState>,
    settings: ReadinessSettings,
}

impl InvocationReadinessGate {
    /// Create a new gate over the given pool view.
    pub fn new(pool: Arc<dyn WorkerPoolState>, settings: ReadinessSettings) -> Self {
        Self { pool, settings }
    }

    /// Whether dispatch may proceed immediately.
    pub fn is_ready(&self) -> bool {
        self.pool.readiness_state().is_ready()
    }

    /// Most recently observed pool state.
    pub fn state(&self) -> DispatcherReadinessState {
        self.pool.readiness_state()
    }

    /// Total time the gate waits for initialization before giving up.
    pub fn wait_bound(&self) -> Duration {
        let attempts = self.pool.error_events_threshold().saturating_add(1);
        self.settings
            .process_start_timeout
            .saturating_mul(attempts)
    }

    /// Wait for the pool to leave `Initializing`.
    ///
    /// Returns `true` only if the bound elapsed while the pool was still
    /// initializing. Becoming ready, reaching a terminal state, or
    /// cancellation all return `false`.
    pub async fn await_ready_or_timeout(&self, cancellation: &CancellationToken) -> bool {
        let bound = self.wait_bound();
        let started = Instant::now();
        // Past the clock's range the wait only ends on readiness or cancellation.
        let deadline = started.checked_add(bound);

        info!(
            state = %self.state(),
            bound_ms = bound.as_millis() as u64,
            "Waiting for worker pool to become ready"
        );

        loop {
            let state = self.pool.readiness_state();
            if state.is_ready() || state.is_terminal() {
                debug!(
                    state = %state,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Stopped waiting for worker pool"
                );
                return false;
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return true;
                    }
                    self.settings.polling_interval.min(deadline - now)
                }
                None => self.settings.polling_interval,
            };
            tokio::select! {
                _ = cancellation.cancelled() => {
                    debug!("Readiness wait cancelled");
                    return false;
                }
                _ = sleep(pause) => {}
            }
        }
    }
}
