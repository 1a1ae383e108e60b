//! Logging initialisation for the host process.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use super::config::LoggingConfig;

/// Install the global `tracing` subscriber, writing to stderr.
///
/// Returns `false` if a subscriber was already installed; repeated calls are
/// harmless.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(config.level))
        .with_ansi(config.ansi)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
