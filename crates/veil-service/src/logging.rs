//! Tracing subscriber setup.
//!
//! Output goes to stderr or an append-only file, as text or JSON.
//! `RUST_LOG` overrides the configured level.

use crate::config::{LogConfig, LogFormat};
use crate::error::{Result, SessionError};
use std::fs::OpenOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber described by `config`.
///
/// Fails with [`SessionError::Logging`] if the level directive does not
/// parse or a subscriber is already installed.
///
/// ```ignore
/// let config = ServiceConfig::load("/etc/veilnet/service.toml")?;
/// init_logging(&config.log)?;
/// ```
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;

    match (&config.file, config.format) {
        (None, LogFormat::Text) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
        (None, LogFormat::Json) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init(),
        (Some(path), format) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            match format {
                LogFormat::Text => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().with_writer(file).with_ansi(false))
                    .try_init(),
                LogFormat::Json => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json().with_writer(file))
                    .try_init(),
            }
        }
    }
    .map_err(|e| SessionError::Logging(e.to_string()))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| SessionError::Logging(e.to_string())),
    }
}
