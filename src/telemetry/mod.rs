//! Tracing initialization.
//!
//! Sets up tracing-subscriber with an env filter and a fmt layer that writes
//! through the test harness, so engine logs show up next to the failing test.

pub mod job;

use crate::error::{Error, Result};

/// Configuration for telemetry initialization.
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is not set (e.g. "info", "queue_double=debug").
    pub default_filter: String,
    /// Use the compact single-line format.
    pub compact: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            compact: false,
        }
    }
}

impl From<&crate::config::Config> for TelemetryConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            default_filter: config.log_level.clone(),
            compact: false,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber was already set, which is normal
/// when several tests call this in one process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .map_err(|e| Error::Config(format!("bad log filter {:?}: {e}", config.default_filter)))?;

    if config.compact {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().compact().with_test_writer())
            .try_init()
            .map_err(|e| Error::Config(format!("failed to init tracing subscriber: {e}")))
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init()
            .map_err(|e| Error::Config(format!("failed to init tracing subscriber: {e}")))
    }
}
