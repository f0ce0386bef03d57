use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
