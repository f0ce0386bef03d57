use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("I/O error for {path}: {message}")]
    Io { path: String, message: String },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Tag read failed for {path}: {message}")]
    TagRead { path: String, message: String },

    #[error("Tag write failed for {path}: {message}")]
    TagWrite { path: String, message: String },

    #[error("Catalog request failed: {0}")]
    Catalog(String),

    #[error("Catalog unreachable: {0}")]
    CatalogUnreachable(String),

    #[error("Metadata lookup failed: {0}")]
    Lookup(String),

    #[error("Rename failed for {path}: {message}")]
    Rename { path: String, message: String },

    #[error("Capability not available: {0}")]
    NotAvailable(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
