//! Worker pool status
//!
//! The single authority over the pool's readiness state. The worker-pool
//! manager drives transitions through [`WorkerPoolStatus`]; the dispatch path
//! only ever sees the read-only [`ReadinessView`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

use courier_core::{DispatcherReadinessState, WorkerId};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::dispatch::readiness::WorkerPoolState;

/// Published readiness state of the worker pool.
pub struct WorkerPoolStatus {
    /// Readiness publisher
    state_tx: watch::Sender<DispatcherReadinessState>,

    /// Workers required before the pool is initialized
    expected_workers: usize,

    /// Workers that have reported ready
    ready_workers: Mutex<HashSet<WorkerId>>,

    /// Error events recorded so far
    error_events: AtomicU32,

    /// Error events tolerated
    error_events_threshold: u32,
}

impl WorkerPoolStatus {
    /// Create a new status in the `Default` state
    pub fn new(expected_workers: usize, error_events_threshold: u32) -> Self {
        let (state_tx, _) = watch::channel(DispatcherReadinessState::Default);

        Self {
            state_tx,
            expected_workers,
            ready_workers: Mutex::new(HashSet::new()),
            error_events: AtomicU32::new(0),
            error_events_threshold,
        }
    }

    /// Current state
    pub fn state(&self) -> DispatcherReadinessState {
        *self.state_tx.borrow()
    }

    /// Read-only view for the dispatch path
    pub fn view(&self) -> ReadinessView {
        ReadinessView {
            state_rx: self.state_tx.subscribe(),
            error_events_threshold: self.error_events_threshold,
        }
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<DispatcherReadinessState> {
        self.state_tx.subscribe()
    }

    /// Start launching workers.
    ///
    /// With no expected workers the pool stays in `Default`.
    pub fn begin_initialization(&self) {
        if self.expected_workers == 0 {
            debug!("No workers expected, readiness stays Default");
            return;
        }

        self.transition(|state| match state {
            DispatcherReadinessState::Default => Some(DispatcherReadinessState::Initializing),
            _ => None,
        });
    }

    /// Record that a worker finished starting up.
    pub fn worker_ready(&self, worker_id: WorkerId) {
        let ready = {
            let mut workers = self.ready_workers.lock();
            workers.insert(worker_id);
            workers.len()
        };

        info!(
            "Worker {} ready ({} of {} expected)",
            worker_id, ready, self.expected_workers
        );

        if ready >= self.expected_workers {
            self.transition(|state| match state {
                DispatcherReadinessState::Initializing => {
                    Some(DispatcherReadinessState::Initialized)
                }
                _ => None,
            });
        }
    }

    /// Record a worker error event. Returns `true` once the threshold is exceeded.
    pub fn record_error_event(&self) -> bool {
        let count = self.error_events.fetch_add(1, Ordering::SeqCst) + 1;
        let exceeded = count > self.error_events_threshold;
        if exceeded {
            warn!(
                "Worker error events ({}) exceeded threshold {}",
                count, self.error_events_threshold
            );
        } else {
            debug!("Worker error event {} of {}", count, self.error_events_threshold);
        }
        exceeded
    }

    /// Error events recorded so far
    pub fn error_events(&self) -> u32 {
        self.error_events.load(Ordering::SeqCst)
    }

    /// Start shutting the pool down
    pub fn begin_disposing(&self) {
        self.transition(|state| match state {
            DispatcherReadinessState::Disposed | DispatcherReadinessState::Disposing => None,
            _ => Some(DispatcherReadinessState::Disposing),
        });
    }

    /// The pool is gone
    pub fn disposed(&self) {
        self.transition(|state| match state {
            DispatcherReadinessState::Disposed => None,
            _ => Some(DispatcherReadinessState::Disposed),
        });
    }

    fn transition<F>(&self, next: F)
    where
        F: FnOnce(DispatcherReadinessState) -> Option<DispatcherReadinessState>,
    {
        self.state_tx.send_if_modified(|state| match next(*state) {
            Some(new_state) if new_state != *state => {
                info!("Worker pool state {} -> {}", state, new_state);
                *state = new_state;
                true
            }
            _ => false,
        });
    }
}

/// Read-only view of a [`WorkerPoolStatus`].
#[derive(Clone)]
pub struct ReadinessView {
    state_rx: watch::Receiver<DispatcherReadinessState>,
    error_events_threshold: u32,
}

impl WorkerPoolState for ReadinessView {
    fn readiness_state(&self) -> DispatcherReadinessState {
        *self.state_rx.borrow()
    }

    fn error_events_threshold(&self) -> u32 {
        self.error_events_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization_flow() {
        let status = WorkerPoolStatus::new(2, 3);
        let view = status.view();
        assert_eq!(view.readiness_state(), DispatcherReadinessState::Default);

        status.begin_initialization();
        assert_eq!(view.readiness_state(), DispatcherReadinessState::Initializing);

        let worker = WorkerId::new();
        status.worker_ready(worker);
        status.worker_ready(worker);
        assert_eq!(view.readiness_state(), DispatcherReadinessState::Initializing);

        status.worker_ready(WorkerId::new());
        assert_eq!(view.readiness_state(), DispatcherReadinessState::Initialized);
        assert_eq!(view.error_events_threshold(), 3);
    }

    #[test]
    fn test_zero_expected_workers_stays_default() {
        let status = WorkerPoolStatus::new(0, 0);
        status.begin_initialization();
        assert_eq!(status.state(), DispatcherReadinessState::Default);
    }

    #[test]
    fn test_disposal_is_terminal() {
        let status = WorkerPoolStatus::new(1, 0);
        status.begin_initialization();
        status.begin_disposing();
        status.worker_ready(WorkerId::new());
        assert_eq!(status.state(), DispatcherReadinessState::Disposing);

        status.disposed();
        status.begin_disposing();
        assert_eq!(status.state(), DispatcherReadinessState::Disposed);
    }

    #[test]
    fn test_error_events_threshold() {
        let status = WorkerPoolStatus::new(1, 1);
        assert!(!status.record_error_event());
        assert!(status.record_error_event());
        assert_eq!(status.error_events(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let status = WorkerPoolStatus::new(1, 0);
        let mut rx = status.subscribe();

        status.begin_initialization();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), DispatcherReadinessState::Initializing);
    }
}
