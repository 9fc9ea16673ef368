//! Error Types

use thiserror::Error;

/// Result type alias for cart storage operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Cart storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error from a file-backed store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cart document could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Cart document parsed but breaks a cart invariant
    #[error("Malformed cart: {0}")]
    Malformed(String),

    /// Item refused by a mutation; the cart is unchanged
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// Storage key contains characters the backend cannot hold
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Backend refused the write (quota, read-only medium, ...)
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Check if retrying the same write may succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Backend(_))
    }
}
