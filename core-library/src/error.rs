use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Group {0} not found")]
    GroupNotFound(String),

    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Unknown metadata field: {0}")]
    InvalidField(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
