//! # Logging & Tracing Bootstrap
//!
//! Configures the `tracing-subscriber` infrastructure: env-filter driven
//! levels (`RUST_LOG` wins when set) and pretty, compact or JSON output.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default().with_format(LogFormat::Compact);
//! init_logging(&config).expect("failed to initialize logging");
//! tracing::info!("core started");
//! ```

use tracing_subscriber::EnvFilter;

use crate::error::{Result, RuntimeError};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Fallback filter directive when `RUST_LOG` is unset (e.g. `"info"`,
    /// `"core_sync=debug"`). Defaults to `info`.
    pub default_filter: Option<String>,
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = Some(filter.into());
        self
    }
}

/// Install the global subscriber. Callable once per process; a second call
/// reports an error rather than panicking.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let fallback = config.default_filter.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .map_err(|e| RuntimeError::LoggingInit(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        LogFormat::Pretty => builder
            .pretty()
            .try_init()
            .map_err(|e| RuntimeError::LoggingInit(e.to_string())),
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| RuntimeError::LoggingInit(e.to_string())),
        LogFormat::Compact => builder
            .compact()
            .try_init()
            .map_err(|e| RuntimeError::LoggingInit(e.to_string())),
    }
}
