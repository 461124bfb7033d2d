/// Audio-specific errors
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// No usable audio backend could be created
    #[error("Audio backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The audio context was closed and cannot be resumed
    #[error("Audio context is closed")]
    ContextClosed,

    /// Graph operation before `initialize()`
    #[error("Audio graph not initialized")]
    NotInitialized,

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Invalid audio buffer
    #[error("Invalid audio buffer: {0}")]
    InvalidBuffer(String),

    /// Symphonia error
    #[error("Symphonia error: {0}")]
    Symphonia(String),
}
