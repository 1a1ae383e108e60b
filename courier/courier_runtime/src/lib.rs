//! Courier Runtime - readiness-gated invocation dispatch
//!
//! This crate provides the dispatch path of the Courier function host:
//! readiness gating, binding resolution, result correlation and return-value
//! handling, along with the worker pool status, worker channels, and host
//! bootstrap/shutdown.

pub mod dispatch;
pub mod system;
pub mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};
use courier_core::FunctionMetadata;
use courier_memory::SharedMemoryManager;
use tracing::info;

use dispatch::{Binding, InvocationDispatcher, InvocationReadinessGate};
use system::shutdown::ShutdownManager;
use system::{ApplicationLifetime, HostConfig, System};
use worker::{InvocationChannel, QueuedInvocationChannel, WorkerInbox, WorkerPoolStatus};

/// Host facade that provides a unified interface to the dispatch core.
pub struct Host {
    /// System component for bootstrap and shutdown
    pub system: Arc<System>,

    /// Published readiness of the worker pool
    pub workers: Arc<WorkerPoolStatus>,
}

impl Host {
    /// Create a new Host instance
    pub async fn new(config_path: Option<&str>) -> Result<Self> {
        let config = HostConfig::load(config_path).await?;
        Self::from_config(config)
    }

    /// Create a Host from an already loaded configuration
    pub fn from_config(config: HostConfig) -> Result<Self> {
        info!("Initializing Courier host");

        let workers = Arc::new(WorkerPoolStatus::new(
            config.expected_workers,
            config.error_events_threshold,
        ));
        let system = Arc::new(System::new(config)?);

        Ok(Self { system, workers })
    }

    /// Host configuration
    pub fn config(&self) -> &HostConfig {
        self.system.config()
    }

    /// Start the host
    pub async fn start(&self) -> Result<()> {
        info!("Starting Courier host");

        self.system.bootstrap().await?;
        self.workers.begin_initialization();

        info!("Courier host started, worker pool is {}", self.workers.state());

        Ok(())
    }

    /// Readiness gate over this host's worker pool
    pub fn readiness_gate(&self) -> InvocationReadinessGate {
        InvocationReadinessGate::new(
            Arc::new(self.workers.view()),
            self.config().readiness_settings(),
        )
    }

    /// Lifetime controller of this host
    pub fn lifetime(&self) -> Result<Arc<ShutdownManager>> {
        self.system.get_shutdown_manager()
    }

    /// Shared memory manager, when transfers are enabled
    pub fn shared_memory(&self) -> Option<Arc<SharedMemoryManager>> {
        if !self.config().shared_memory.enabled {
            return None;
        }
        self.system.get_shared_memory().ok()
    }

    /// In-process worker channel wired to this host's shared memory.
    ///
    /// Once the host has started, the inbox is drained on shutdown.
    pub fn queued_channel(&self, capacity: usize) -> (QueuedInvocationChannel, WorkerInbox) {
        let (mut channel, mut inbox) = QueuedInvocationChannel::new(capacity);
        if let Some(manager) = self.shared_memory() {
            channel = channel.with_shared_memory(manager);
        }
        if let Ok(lifetime) = self.lifetime() {
            inbox = inbox.drain_on(lifetime.register_component("worker-inbox"));
        }
        (channel, inbox)
    }

    /// Build a dispatcher for one function
    pub fn dispatcher(
        &self,
        function: FunctionMetadata,
        bindings: Vec<Arc<dyn Binding>>,
        channel: Arc<dyn InvocationChannel>,
    ) -> Result<InvocationDispatcher> {
        let lifetime: Arc<dyn ApplicationLifetime> = self
            .lifetime()
            .context("Host must be started before building dispatchers")?;

        let name = function.name.clone();
        let dispatcher =
            InvocationDispatcher::new(function, bindings, self.readiness_gate(), lifetime, channel)
                .with_context(|| format!("Invalid function '{}'", name))?;

        Ok(match self.shared_memory() {
            Some(manager) => dispatcher.with_shared_memory(manager),
            None => dispatcher,
        })
    }

    /// Wait for a stop request, then shut down
    pub async fn run_until_stopped(&self) -> Result<()> {
        self.lifetime()?.stopped().await;
        self.shutdown().await
    }

    /// Gracefully shut down the host
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Courier host");

        self.workers.begin_disposing();
        self.system.shutdown().await?;
        self.workers.disposed();

        info!("Courier host shut down successfully");

        Ok(())
    }
}
