//! Tracing setup for hosts embedding the engine.
//!
//! The engine only emits `tracing` events; installing a subscriber is up to
//! the host. [`init_tracing`] installs the default fmt subscriber, controlled
//! via the `RUST_LOG` environment variable, e.g. `RUST_LOG=pert=debug`.

use crate::config::EngineConfig;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, else by the configured
/// `log-filter`.
///
/// Returns `false` if a global subscriber was already installed, which
/// leaves the existing one in place.
pub fn init_tracing(config: &EngineConfig) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(filter = %config.log_filter, "tracing initialised");
    }
    installed
}
