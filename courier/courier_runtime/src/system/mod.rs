//! System management for the Courier host
//!
//! This module provides components for host bootstrap, configuration,
//! logging and shutdown.

pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod shutdown;

// Re-export key types for convenience
pub use bootstrap::System;
pub use config::{HostConfig, LoggingConfig, ReadinessSettings};
pub use shutdown::{ApplicationLifetime, DrainHandle, ShutdownManager};
