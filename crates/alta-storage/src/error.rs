use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for volume backends.
///
/// Backends report each failure class distinctly; consumers treat every
/// status other than success as "this operation did not complete" and degrade
/// per-device rather than propagating to the guest.
///
/// Note: [`StoreError::Io`] stores a human-readable `String` rather than
/// `std::io::Error` so backends not built on `std::io` (an SD-card FAT
/// driver, say) can surface their own status codes through the same variant.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("storage full")]
    Full,

    #[error("volume not mounted")]
    NotMounted,

    /// Generic I/O failure that does not map to a more structured variant.
    #[error("io error: {0}")]
    Io(String),
}
