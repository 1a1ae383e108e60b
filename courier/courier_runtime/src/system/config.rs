//! Configuration for the Courier host
//!
//! Handles loading and managing host configuration.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use courier_core::LogLevel;
use courier_memory::SharedMemoryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

/// Errors that can occur in configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Maximum level emitted
    #[serde(default)]
    pub level: LogLevel,

    /// Whether to colour output
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

fn default_ansi() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            ansi: default_ansi(),
        }
    }
}

/// Settings the readiness gate needs, derived from [`HostConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessSettings {
    /// How long one worker process may take to start
    pub process_start_timeout: Duration,

    /// How often readiness is sampled while waiting
    pub polling_interval: Duration,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            process_start_timeout: Duration::from_secs(default_process_start_timeout()),
            polling_interval: Duration::from_millis(default_polling_interval()),
        }
    }
}

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Time allowed for a worker process to start (seconds)
    #[serde(default = "default_process_start_timeout")]
    pub process_start_timeout_seconds: u64,

    /// Readiness polling interval (milliseconds)
    #[serde(default = "default_polling_interval")]
    pub worker_ready_check_polling_interval_ms: u64,

    /// Worker error events tolerated before the pool gives up
    #[serde(default = "default_error_events_threshold")]
    pub error_events_threshold: u32,

    /// Workers that must report ready before dispatch starts
    #[serde(default = "default_expected_workers")]
    pub expected_workers: usize,

    /// Bootstrap timeout (seconds) for each phase
    #[serde(default = "default_bootstrap_timeouts")]
    pub bootstrap_timeouts: HashMap<u8, u32>,

    /// Shutdown timeout (seconds)
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u32,

    /// Shared memory transfer settings
    #[serde(default)]
    pub shared_memory: SharedMemoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Additional configuration
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_process_start_timeout() -> u64 {
    60
}

fn default_polling_interval() -> u64 {
    25
}

fn default_error_events_threshold() -> u32 {
    3
}

fn default_expected_workers() -> usize {
    1
}

fn default_bootstrap_timeouts() -> HashMap<u8, u32> {
    let mut timeouts = HashMap::new();
    timeouts.insert(0, 30); // Phase 0: Core
    timeouts.insert(1, 30); // Phase 1: Shared memory
    timeouts
}

fn default_shutdown_timeout() -> u32 {
    30
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            process_start_timeout_seconds: default_process_start_timeout(),
            worker_ready_check_polling_interval_ms: default_polling_interval(),
            error_events_threshold: default_error_events_threshold(),
            expected_workers: default_expected_workers(),
            bootstrap_timeouts: default_bootstrap_timeouts(),
            shutdown_timeout: default_shutdown_timeout(),
            shared_memory: SharedMemoryConfig::default(),
            logging: LoggingConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl HostConfig {
    /// Load configuration from a file
    pub async fn load(path: Option<&str>) -> Result<Self> {
        let mut config = HostConfig::default();

        if let Some(path) = path {
            info!("Loading configuration from {}", path);

            if !Path::new(path).exists() {
                warn!("Configuration file not found: {}", path);
                return Ok(config);
            }

            let content = fs::read_to_string(path)
                .await
                .map_err(|e| ConfigError::LoadFailed(e.to_string()))
                .context(format!("Failed to read configuration file: {}", path))?;

            config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseFailed(e.to_string()))
                .context(format!("Failed to parse configuration file: {}", path))?;
        } else {
            info!("No configuration file specified, using defaults");
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.process_start_timeout_seconds == 0 {
            return Err(
                ConfigError::Invalid("Process start timeout cannot be zero".to_string()).into(),
            );
        }

        if self.worker_ready_check_polling_interval_ms == 0 {
            return Err(ConfigError::Invalid("Polling interval cannot be zero".to_string()).into());
        }

        let start_timeout_ms = self
            .process_start_timeout_seconds
            .checked_mul(1000)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "Process start timeout of {} seconds is too large",
                    self.process_start_timeout_seconds
                ))
            })?;

        if self.worker_ready_check_polling_interval_ms > start_timeout_ms {
            warn!(
                "Polling interval of {}ms exceeds the process start timeout",
                self.worker_ready_check_polling_interval_ms
            );
        }

        for phase in 0..2 {
            if !self.bootstrap_timeouts.contains_key(&phase) {
                return Err(ConfigError::Invalid(format!(
                    "Missing bootstrap timeout for phase {}",
                    phase
                ))
                .into());
            }
        }

        if self.shutdown_timeout == 0 {
            return Err(ConfigError::Invalid("Shutdown timeout cannot be zero".to_string()).into());
        }

        let shm = &self.shared_memory;
        if shm.min_transfer_bytes > shm.max_transfer_bytes {
            return Err(ConfigError::Invalid(format!(
                "Shared memory minimum transfer size {} exceeds maximum {}",
                shm.min_transfer_bytes, shm.max_transfer_bytes
            ))
            .into());
        }

        Ok(())
    }

    /// Merge with another configuration
    pub fn merge(&mut self, other: HostConfig) {
        if other.process_start_timeout_seconds > 0 {
            self.process_start_timeout_seconds = other.process_start_timeout_seconds;
        }

        if other.worker_ready_check_polling_interval_ms > 0 {
            self.worker_ready_check_polling_interval_ms = other.worker_ready_check_polling_interval_ms;
        }

        self.error_events_threshold = other.error_events_threshold;
        self.expected_workers = other.expected_workers;

        for (phase, timeout) in other.bootstrap_timeouts {
            self.bootstrap_timeouts.insert(phase, timeout);
        }

        if other.shutdown_timeout > 0 {
            self.shutdown_timeout = other.shutdown_timeout;
        }

        if other.shared_memory.enabled {
            self.shared_memory = other.shared_memory;
        }

        self.logging = other.logging;

        for (key, value) in other.extra {
            self.extra.insert(key, value);
        }
    }

    /// Readiness gate timing.
    pub fn readiness_settings(&self) -> ReadinessSettings {
        ReadinessSettings {
            process_start_timeout: Duration::from_secs(self.process_start_timeout_seconds),
            polling_interval: Duration::from_millis(self.worker_ready_check_polling_interval_ms),
        }
    }
}
