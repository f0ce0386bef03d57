//! # Core Configuration
//!
//! Runtime settings for scanning and catalog sync, constructed through a
//! builder with fail-fast validation: an invalid value aborts construction
//! with an actionable message instead of surfacing later mid-operation.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .scan_workers(4)
//!     .sync_chunk_size(50)
//!     .build()
//!     .expect("valid config");
//! ```

use std::time::Duration;

use crate::error::{Result, RuntimeError};

/// Default audio extensions recognized by the scanner.
pub const DEFAULT_AUDIO_EXTENSIONS: [&str; 9] =
    ["mp3", "m4a", "m4b", "flac", "ogg", "opus", "aac", "wav", "wma"];

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Bounded worker count for parallel tag reads during scan.
    pub scan_workers: usize,

    /// Audio file extensions to include (lowercase, no dot).
    pub audio_extensions: Vec<String>,

    /// Items per catalog sync chunk.
    pub sync_chunk_size: usize,

    /// Pause between sync chunks, respecting the catalog's rate limits.
    pub sync_chunk_delay: Duration,

    /// Event bus buffer capacity.
    pub event_buffer: usize,

    /// Whether tag writes keep a backup copy by default.
    pub backup_before_write: bool,
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            scan_workers: default_scan_workers(),
            audio_extensions: DEFAULT_AUDIO_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            sync_chunk_size: 50,
            sync_chunk_delay: Duration::from_millis(250),
            event_buffer: 100,
            backup_before_write: true,
        }
    }
}

/// A small multiple of the available cores, capped so a scan never
/// overwhelms disk I/O.
fn default_scan_workers() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    (cores * 2).clamp(2, 8)
}

/// Builder for [`CoreConfig`].
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    scan_workers: Option<usize>,
    audio_extensions: Option<Vec<String>>,
    sync_chunk_size: Option<usize>,
    sync_chunk_delay: Option<Duration>,
    event_buffer: Option<usize>,
    backup_before_write: Option<bool>,
}

impl CoreConfigBuilder {
    pub fn scan_workers(mut self, workers: usize) -> Self {
        self.scan_workers = Some(workers);
        self
    }

    pub fn audio_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audio_extensions = Some(
            extensions
                .into_iter()
                .map(|e| e.into().to_lowercase())
                .collect(),
        );
        self
    }

    pub fn sync_chunk_size(mut self, size: usize) -> Self {
        self.sync_chunk_size = Some(size);
        self
    }

    pub fn sync_chunk_delay(mut self, delay: Duration) -> Self {
        self.sync_chunk_delay = Some(delay);
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    pub fn backup_before_write(mut self, backup: bool) -> Self {
        self.backup_before_write = Some(backup);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidConfig`] when a value is out of range
    /// (zero workers, zero/oversized chunks, empty extension list).
    pub fn build(self) -> Result<CoreConfig> {
        let defaults = CoreConfig::default();
        let config = CoreConfig {
            scan_workers: self.scan_workers.unwrap_or(defaults.scan_workers),
            audio_extensions: self
                .audio_extensions
                .unwrap_or(defaults.audio_extensions),
            sync_chunk_size: self.sync_chunk_size.unwrap_or(defaults.sync_chunk_size),
            sync_chunk_delay: self.sync_chunk_delay.unwrap_or(defaults.sync_chunk_delay),
            event_buffer: self.event_buffer.unwrap_or(defaults.event_buffer),
            backup_before_write: self
                .backup_before_write
                .unwrap_or(defaults.backup_before_write),
        };

        if config.scan_workers == 0 {
            return Err(RuntimeError::InvalidConfig {
                field: "scan_workers".into(),
                reason: "must be at least 1".into(),
            });
        }
        if config.sync_chunk_size == 0 || config.sync_chunk_size > 500 {
            return Err(RuntimeError::InvalidConfig {
                field: "sync_chunk_size".into(),
                reason: "must be between 1 and 500".into(),
            });
        }
        if config.audio_extensions.is_empty() {
            return Err(RuntimeError::InvalidConfig {
                field: "audio_extensions".into(),
                reason: "at least one extension is required".into(),
            });
        }
        if config.event_buffer == 0 {
            return Err(RuntimeError::InvalidConfig {
                field: "event_buffer".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(config)
    }
}
