//! Log output setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    #[default]
    Json,
    /// Human-readable format (for development).
    Human,
}

/// Install a global `tracing` subscriber.
///
/// `filter` takes `EnvFilter` directives such as `turbo_route_data=debug`.
/// Fails if the directives do not parse or a subscriber is already set.
pub fn init(format: LogFormat, filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install subscriber: {}", e)),
        LogFormat::Human => builder
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install subscriber: {}", e)),
    }
}

/// Install a subscriber from the `[logging]` config section.
pub fn init_from_config(config: &LoggingConfig) -> Result<()> {
    init(config.format, &config.filter)
}
