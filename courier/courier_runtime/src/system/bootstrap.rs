//! System Bootstrap for the Courier host
//!
//! Handles host initialization and the bootstrap sequence.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use courier_memory::{platform_accessor, SharedMemoryManager};
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::{info, warn};

use super::config::HostConfig;
use super::shutdown::ShutdownManager;

/// Errors that can occur during bootstrap
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Phase {0:?} bootstrap failed: {1}")]
    PhaseFailed(BootstrapPhase, String),

    #[error("Bootstrap timeout in phase {0:?}")]
    Timeout(BootstrapPhase),

    #[error("Dependency {0} not initialized")]
    DependencyNotInitialized(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Bootstrap phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPhase {
    /// Phase 0: Configuration and shutdown manager
    Core = 0,

    /// Phase 1: Shared memory accessor probe
    SharedMemory = 1,

    /// Host is fully bootstrapped
    Complete = 2,
}

/// State of the host system
pub struct System {
    /// Host configuration
    config: HostConfig,

    /// Last completed bootstrap phase
    phase: parking_lot::Mutex<Option<BootstrapPhase>>,

    /// Shutdown manager
    shutdown_manager: OnceCell<Arc<ShutdownManager>>,

    /// Shared memory manager
    shared_memory: OnceCell<Arc<SharedMemoryManager>>,
}

impl System {
    /// Create a new system
    pub fn new(config: HostConfig) -> Result<Self> {
        Ok(Self {
            config,
            phase: parking_lot::Mutex::new(None),
            shutdown_manager: OnceCell::new(),
            shared_memory: OnceCell::new(),
        })
    }

    /// Host configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Last completed phase, if any.
    pub fn phase(&self) -> Option<BootstrapPhase> {
        *self.phase.lock()
    }

    /// Bootstrap the system
    pub async fn bootstrap(&self) -> Result<()> {
        info!("Starting host bootstrap");

        self.run_phase(BootstrapPhase::Core, self.bootstrap_core()).await?;
        self.run_phase(BootstrapPhase::SharedMemory, self.bootstrap_shared_memory())
            .await?;
        *self.phase.lock() = Some(BootstrapPhase::Complete);

        info!("Host bootstrap complete");

        Ok(())
    }

    async fn run_phase<F>(&self, phase: BootstrapPhase, work: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        info!("Bootstrap phase {:?}", phase);

        let phase_timeout = self
            .config
            .bootstrap_timeouts
            .get(&(phase as u8))
            .copied()
            .unwrap_or(30);

        match timeout(Duration::from_secs(phase_timeout as u64), work).await {
            Ok(Ok(())) => {
                *self.phase.lock() = Some(phase);
                Ok(())
            }
            Ok(Err(e)) => Err(BootstrapError::PhaseFailed(phase, e.to_string()).into()),
            Err(_) => Err(BootstrapError::Timeout(phase).into()),
        }
    }

    /// Phase 0: configuration and shutdown manager
    async fn bootstrap_core(&self) -> Result<()> {
        self.config
            .validate()
            .map_err(|e| BootstrapError::ConfigError(e.to_string()))?;

        if self.shutdown_manager.get().is_none() {
            let manager = ShutdownManager::new(&self.config);
            let _ = self.shutdown_manager.set(Arc::new(manager));
        }

        Ok(())
    }

    /// Phase 1: select the shared memory accessor for this platform
    async fn bootstrap_shared_memory(&self) -> Result<()> {
        if self.shared_memory.get().is_some() {
            return Ok(());
        }

        let accessor = platform_accessor()?;
        if !self.config.shared_memory.enabled {
            info!("Shared memory transfer disabled");
        }

        let manager = SharedMemoryManager::new(accessor, self.config.shared_memory.clone());
        let _ = self.shared_memory.set(Arc::new(manager));

        Ok(())
    }

    /// Shut down the system
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down host");

        match self.shutdown_manager.get() {
            Some(manager) => manager.drain().await?,
            None => warn!("Host was never bootstrapped, nothing to drain"),
        }

        info!("Host shutdown complete");

        Ok(())
    }

    /// Get the shutdown manager
    pub fn get_shutdown_manager(&self) -> Result<Arc<ShutdownManager>> {
        self.shutdown_manager.get().cloned().ok_or_else(|| {
            BootstrapError::DependencyNotInitialized("ShutdownManager".to_string()).into()
        })
    }

    /// Get the shared memory manager
    pub fn get_shared_memory(&self) -> Result<Arc<SharedMemoryManager>> {
        self.shared_memory.get().cloned().ok_or_else(|| {
            BootstrapError::DependencyNotInitialized("SharedMemoryManager".to_string()).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap() -> Result<()> {
        let config = HostConfig {
            shutdown_timeout: 2,
            ..HostConfig::default()
        };

        let system = System::new(config).unwrap();
        assert!(system.get_shutdown_manager().is_err());

        system.bootstrap().await?;
        assert_eq!(system.phase(), Some(BootstrapPhase::Complete));
        assert!(system.get_shared_memory().is_ok());

        let shutdown_manager = system.get_shutdown_manager()?;
        let mut handle = shutdown_manager.register_component("inbox");

        tokio::spawn(async move {
            handle.drain_requested().await;
            handle.drained();
        });

        system.shutdown().await?;
        assert!(shutdown_manager.pending_components().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_invalid_config() {
        let config = HostConfig {
            process_start_timeout_seconds: 0,
            ..HostConfig::default()
        };

        let system = System::new(config).unwrap();
        let err = system.bootstrap().await.unwrap_err();
        assert!(err.to_string().contains("Core"));
        assert_eq!(system.phase(), None);
    }
}
