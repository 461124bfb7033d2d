//! Error types for playback

use emepetre_audio::AudioError;
use emepetre_core::CoreError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No usable audio backend; the engine stays empty
    #[error("Audio initialization failed: {0}")]
    Initialization(String),

    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Audio graph, backend or decoder error
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Persistent store error
    #[error(transparent)]
    Store(#[from] CoreError),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
