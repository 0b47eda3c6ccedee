//! Tracing setup
//!
//! One global subscriber per process. The filter comes from `RUST_LOG` when
//! set, otherwise from the configured default directive.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, e.g. `info` or `aether_transport=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Invalid log filter {directive:?}: {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("Tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Build the filter: `RUST_LOG` wins over the configured level
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter, ObservabilityError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| ObservabilityError::InvalidFilter {
        directive: config.level.clone(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber. A second call reports an error.
pub fn init_tracing(config: &LogConfig) -> Result<(), ObservabilityError> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };
    installed.map_err(|e| ObservabilityError::AlreadyInstalled(e.to_string()))?;

    tracing::debug!(level = %config.level, format = ?config.format, "tracing installed");
    Ok(())
}
