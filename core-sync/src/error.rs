use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Catalog unreachable: {0}")]
    Unreachable(String),

    #[error("A catalog sync is already in progress")]
    SyncInProgress,
}

pub type Result<T> = std::result::Result<T, SyncError>;
