//! Structured logging setup.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`.
///
/// # Errors
///
/// Returns an error when a global subscriber is already installed.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
}
