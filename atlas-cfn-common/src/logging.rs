//! Logging configuration
//!
//! Handlers write progress events to stdout, so all log output goes to stderr.

use crate::config::Settings;
use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,     // fallback level when RUST_LOG is unset
    pub json_format: bool, // use JSON formatting
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl From<&Settings> for LoggingConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            level: settings.log_level.clone(),
            json_format: settings.log_json,
            ..Default::default()
        }
    }
}

impl LoggingConfig {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Install the global subscriber. Fails if one is already installed.
    pub fn init(&self) -> Result<(), tracing_subscriber::util::TryInitError> {
        let registry = tracing_subscriber::registry().with(self.filter());

        if self.json_format {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(self.with_target)
                        .with_current_span(true)
                        .with_writer(io::stderr),
                )
                .try_init()?;
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(self.with_target)
                        .with_ansi(false)
                        .with_writer(io::stderr),
                )
                .try_init()?;
        }

        tracing::debug!(level = %self.level, json = self.json_format, "logging initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = Settings {
            log_level: "debug".to_string(),
            log_json: true,
            ..Default::default()
        };

        let config = LoggingConfig::from(&settings);
        assert_eq!(config.level, "debug");
        assert!(config.json_format);
        assert!(config.with_target);
    }
}
