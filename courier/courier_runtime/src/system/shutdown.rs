//! Host lifetime and graceful drain
//!
//! [`ShutdownManager`] is the host's [`ApplicationLifetime`]: the dispatch
//! path asks it to stop the host, and the host's run loop waits on it.
//!
//! Components that own in-flight work (worker inboxes) register for drain.
//! Shutdown runs in two phases: every component is told to stop taking new
//! work, then the manager waits, bounded by the shutdown timeout, until each
//! has reported drained. A [`DrainHandle`] reports drained when it is dropped,
//! so a component that goes away early never holds shutdown up.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{broadcast, Notify, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::HostConfig;

/// Errors that can occur during shutdown
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("Drain timed out with {0} component(s) still busy")]
    Timeout(usize),

    #[error("Drain wait failed: {0}")]
    DrainFailed(String),

    #[error("Shutdown already in progress")]
    AlreadyInProgress,
}

/// Controls the lifetime of the whole host process.
pub trait ApplicationLifetime: Send + Sync {
    /// Request an orderly stop of the host. Only the first call has an effect.
    fn stop_application(&self);

    /// Whether a stop has been requested.
    fn is_stopping(&self) -> bool;
}

type Pending = Arc<Mutex<HashMap<String, String>>>;

/// Registration of one component that must drain before shutdown completes.
pub struct DrainHandle {
    signal: broadcast::Receiver<()>,
    drained: Arc<Semaphore>,
    pending: Pending,
    id: String,
    name: String,
}

impl DrainHandle {
    /// Resolve once drain has been requested.
    ///
    /// Also resolves if the manager is gone.
    pub async fn drain_requested(&mut self) {
        loop {
            match self.signal.recv().await {
                Ok(()) | Err(broadcast::error::RecvError::Closed) => return,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }

    /// Component name given at registration
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Report the component as drained.
    pub fn drained(self) {}
}

impl Drop for DrainHandle {
    fn drop(&mut self) {
        if self.pending.lock().remove(&self.id).is_some() {
            debug!("Component {} drained", self.name);
            self.drained.add_permits(1);
        }
    }
}

/// Host lifetime controller and drain coordinator
pub struct ShutdownManager {
    /// Drain signal sender
    drain_tx: broadcast::Sender<()>,

    /// One permit per drained component
    drained: Arc<Semaphore>,

    /// Components registered and not yet drained, by id
    pending: Pending,

    /// Components registered so far
    registered: Mutex<usize>,

    /// Bound on the drain phase
    drain_timeout: Duration,

    /// Set once shutdown starts
    in_progress: AtomicBool,

    /// Set by the first stop request
    stop_requested: AtomicBool,

    /// Woken when a stop is requested
    stop_notify: Notify,
}

impl ShutdownManager {
    /// Create a new shutdown manager
    pub fn new(config: &HostConfig) -> Self {
        let (drain_tx, _) = broadcast::channel(4);

        Self {
            drain_tx,
            drained: Arc::new(Semaphore::new(0)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            registered: Mutex::new(0),
            drain_timeout: Duration::from_secs(u64::from(config.shutdown_timeout)),
            in_progress: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
        }
    }

    /// Register a component that must drain before shutdown completes
    pub fn register_component(&self, name: &str) -> DrainHandle {
        let id = Uuid::new_v4().to_string();
        self.pending.lock().insert(id.clone(), name.to_string());
        *self.registered.lock() += 1;

        debug!("Registered {} for drain ({})", name, id);

        DrainHandle {
            signal: self.drain_tx.subscribe(),
            drained: self.drained.clone(),
            pending: self.pending.clone(),
            id,
            name: name.to_string(),
        }
    }

    /// Components registered and not yet drained
    pub fn pending_components(&self) -> Vec<String> {
        self.pending.lock().values().cloned().collect()
    }

    /// Wait until a stop has been requested through [`ApplicationLifetime`].
    pub async fn stopped(&self) {
        loop {
            let notified = self.stop_notify.notified();
            if self.is_stopping() {
                return;
            }
            notified.await;
        }
    }

    /// Drain every registered component.
    ///
    /// May run once; a second call fails with
    /// [`ShutdownError::AlreadyInProgress`].
    pub async fn drain(&self) -> Result<()> {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            return Err(ShutdownError::AlreadyInProgress.into());
        }

        let registered = *self.registered.lock();
        let busy = self.pending.lock().len();
        info!(
            "Draining {} of {} registered component(s)",
            busy, registered
        );

        if busy > 0 {
            // Receivers may all be gone already; their handles have dropped.
            let _ = self.drain_tx.send(());
        }

        match timeout(self.drain_timeout, self.wait_drained(registered)).await {
            Ok(result) => result?,
            Err(_) => {
                let still_busy = self.pending_components();
                error!(
                    "Drain timed out after {:?}, still busy: {}",
                    self.drain_timeout,
                    still_busy.join(", ")
                );
                return Err(ShutdownError::Timeout(still_busy.len()).into());
            }
        }

        info!("All components drained");
        Ok(())
    }

    async fn wait_drained(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        let permits = u32::try_from(count)
            .map_err(|_| ShutdownError::DrainFailed(format!("{} components", count)))?;
        self.drained
            .acquire_many(permits)
            .await
            .map(|permits| permits.forget())
            .map_err(|e| ShutdownError::DrainFailed(e.to_string()).into())
    }
}

impl ApplicationLifetime for ShutdownManager {
    fn stop_application(&self) {
        if self.stop_requested.swap(true, Ordering::SeqCst) {
            debug!("Host stop already requested");
            return;
        }

        warn!("Host stop requested");
        self.stop_notify.notify_waiters();
    }

    fn is_stopping(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn manager(shutdown_timeout: u32) -> Arc<ShutdownManager> {
        let config = HostConfig {
            shutdown_timeout,
            ..HostConfig::default()
        };
        Arc::new(ShutdownManager::new(&config))
    }

    #[tokio::test]
    async fn test_drain_waits_for_components() {
        let manager = manager(2);
        let mut inbox = manager.register_component("inbox");
        let early = manager.register_component("idle");
        early.drained();

        let worker = tokio::spawn(async move {
            inbox.drain_requested().await;
            sleep(Duration::from_millis(20)).await;
            inbox.drained();
        });

        manager.drain().await.unwrap();
        assert!(manager.pending_components().is_empty());
        worker.await.unwrap();

        let err = manager.drain().await.unwrap_err();
        assert!(err.to_string().contains("already in progress"));
    }

    #[tokio::test]
    async fn test_dropped_handle_counts_as_drained() {
        let manager = manager(1);
        drop(manager.register_component("abandoned"));

        manager.drain().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_timeout_names_busy_components() {
        let manager = manager(1);
        let mut stuck = manager.register_component("stuck-inbox");

        let _slow = tokio::spawn(async move {
            stuck.drain_requested().await;
            sleep(Duration::from_secs(10)).await;
            stuck.drained();
        });

        let err = manager.drain().await.unwrap_err();
        assert!(err.to_string().contains("1 component(s) still busy"));
        assert_eq!(manager.pending_components(), vec!["stuck-inbox".to_string()]);
    }

    #[tokio::test]
    async fn test_stop_application_is_idempotent() {
        let manager = manager(1);
        assert!(!manager.is_stopping());

        let waiter = tokio::spawn({
            let manager = manager.clone();
            async move { manager.stopped().await }
        });

        manager.stop_application();
        manager.stop_application();

        assert!(manager.is_stopping());
        waiter.await.unwrap();
        manager.stopped().await;
    }
}
