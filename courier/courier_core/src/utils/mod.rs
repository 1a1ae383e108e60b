//! Utility types shared across crates.

pub mod logging;

pub use logging::LogLevel;
