use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Capability missing: {0}")]
    CapabilityMissing(&'static str),

    #[error("Scan error: {0}")]
    Scan(#[from] core_scan::ScanError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::RuntimeError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
