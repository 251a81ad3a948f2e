//! Error types for delivery and actuation
use spectralight_core::CoreError;
use thiserror::Error;

/// Delivery errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// Transport could not be established
    #[error("Transport connect error: {0}")]
    TransportConnect(String),

    /// Transport failed after connecting
    #[error("Transport error: {0}")]
    Transport(String),

    /// OSC encode/decode error
    #[error("OSC error: {0}")]
    Osc(String),

    /// Actuation output failed
    #[error("Actuation error: {0}")]
    Actuation(String),

    /// Channel index beyond the sink
    #[error("Channel {channel} out of range (sink has {count} channels)")]
    ChannelOutOfRange {
        /// Requested channel
        channel: usize,
        /// Channels available
        count: usize,
    },

    /// Payload could not be interpreted
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Analysis error
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
