//! Error types for audio loading and playback
use std::path::PathBuf;
use thiserror::Error;

/// Media errors
#[derive(Error, Debug)]
pub enum MediaError {
    /// Input path does not exist
    #[error("Audio file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File could not be opened
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Container format not recognized
    #[error("Unsupported or unrecognized format: {0}")]
    Probe(String),

    /// Container holds no decodable audio track
    #[error("No audio track found")]
    NoAudioTrack,

    /// Codec or packet error
    #[error("Decode error: {0}")]
    Decode(String),

    /// Sample rate conversion failed
    #[error("Resample error: {0}")]
    Resample(String),

    /// File decoded to zero samples
    #[error("Audio file contains no samples")]
    Empty,

    /// Output device or stream error
    #[error("Playback error: {0}")]
    Playback(String),
}

/// Result type for media operations
pub type Result<T> = std::result::Result<T, MediaError>;
