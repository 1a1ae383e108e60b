//! Worker-pool readiness as observed by the dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the worker pool behind the dispatcher.
///
/// Transitions are owned by the worker-pool manager; the dispatch path only
/// reads the current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatcherReadinessState {
    /// No workers are configured or required.
    #[default]
    Default,

    /// Workers are being launched.
    Initializing,

    /// At least the expected workers are up.
    Initialized,

    /// The pool is shutting down.
    Disposing,

    /// The pool is gone.
    Disposed,
}

impl DispatcherReadinessState {
    /// Whether an invocation may be dispatched immediately.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Default | Self::Initialized)
    }

    /// Whether the pool can no longer become ready.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disposing | Self::Disposed)
    }
}

impl fmt::Display for DispatcherReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Initialized => write!(f, "Initialized"),
            Self::Disposing => write!(f, "Disposing"),
            Self::Disposed => write!(f, "Disposed"),
        }
    }
}
