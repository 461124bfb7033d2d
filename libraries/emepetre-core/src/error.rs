/// Core error types for Emepetre
use crate::types::TrackId;
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by persistence collaborators
#[derive(Error, Debug)]
pub enum CoreError {
    /// Store is unreachable or rejected the operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// Audio bytes for the track are not available
    #[error("No audio stored for track: {0}")]
    AudioNotFound(TrackId),

    /// Track not found
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
