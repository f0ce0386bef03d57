//! # Runtime Infrastructure
//!
//! Cross-cutting plumbing shared by every core crate:
//!
//! - **Events** (`events`): typed broadcast bus used for push-based progress
//!   reporting (tag writes, catalog sync) and operation lifecycle events
//! - **Config** (`config`): validated, builder-constructed runtime settings
//! - **Logging** (`logging`): `tracing-subscriber` bootstrap with env-filter
//!   and pretty/compact/JSON output

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Result, RuntimeError};
pub use events::{CoreEvent, EventBus, ScanEvent, SyncEvent, WriteEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};
