//! Tracing initialization for host processes.
//!
//! The core only emits `tracing` events; hosts embedding the crate call
//! [`init`] (or install their own subscriber) before serving traffic.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Console logging toggles.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `RUST_LOG`-style filter applied when the env var is unset.
    pub default_filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json_format: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: "info,sqlx=warn".to_string(),
            json_format: false,
        }
    }
}

/// Install a global subscriber. Errors if one is already set.
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
    }

    Ok(())
}
