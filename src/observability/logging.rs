//! # Logging
//!
//! Tracing subscriber setup. `RUST_LOG` wins when set, otherwise the
//! configured `LOG_LEVEL` applies to this crate only.

use crate::config::{ConfiguratorConfig, LogFormat};
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

pub fn init_tracing(config: &ConfiguratorConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "cloudflare_configurator={}",
            config.log_level.to_lowercase()
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}"))
}
