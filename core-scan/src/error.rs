use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("No paths supplied to scan")]
    NoPaths,

    #[error("A scan is already in progress")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, ScanError>;
