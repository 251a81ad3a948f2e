//! Error types for the analysis core
use thiserror::Error;

/// Core analysis errors
#[derive(Error, Debug)]
pub enum CoreError {
    /// A frame did not match the configured window size
    #[error("Frame length mismatch: expected {expected} samples, got {actual}")]
    FrameLength {
        /// Configured window size
        expected: usize,
        /// Length of the rejected frame
        actual: usize,
    },

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
