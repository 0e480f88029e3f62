use std::fmt;

// === StoreError ===

/// Errors raised by the physical storage backends.
///
/// These never cross the crate's public boundary: the [`Store`](crate::store::Store)
/// catches them, logs a warning, and degrades the operation to a no-op or `None`.
#[derive(Debug)]
pub enum StoreError {
    /// The underlying backend rejected or failed the operation.
    Backend(String),
    /// Reading or writing a backend file failed.
    Io(String),
    /// A value could not be encoded or decoded.
    Serialization(String),
    /// The value exceeds the backend's per-key capacity.
    ValueTooLarge { key: String, size: usize },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "Storage backend error: {}", msg),
            StoreError::Io(msg) => write!(f, "Storage I/O error: {}", msg),
            StoreError::Serialization(msg) => {
                write!(f, "Storage serialization error: {}", msg)
            }
            StoreError::ValueTooLarge { key, size } => {
                write!(f, "Value for key '{}' too large: {} bytes", key, size)
            }
        }
    }
}

impl std::error::Error for StoreError {}

// === SyncError ===

/// Errors raised inside the remote sync transport.
///
/// Transport implementations convert these into an `ok: false` result with an
/// `error` string; callers never see them as `Err`.
#[derive(Debug)]
pub enum SyncError {
    /// The configured base URL could not be parsed.
    InvalidBaseUrl(String),
    /// The request failed at the network level.
    Network(String),
    /// The response body could not be decoded as the expected envelope.
    Decode(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::InvalidBaseUrl(url) => write!(f, "Invalid base URL: {}", url),
            SyncError::Network(msg) => write!(f, "Sync network error: {}", msg),
            SyncError::Decode(msg) => write!(f, "Sync response decode error: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {}
