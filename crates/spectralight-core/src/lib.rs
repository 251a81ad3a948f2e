//! SpectraLight Core - Spectral analysis and intensity mapping
//!
//! This crate contains the audio-to-light domain model, including:
//! - Session configuration (TOML, serde defaults)
//! - Frame windowing over a decoded sample buffer
//! - FFT magnitude spectra and bass/mid/treble partitioning
//! - Energy and threshold intensity policies with spatial patterns
//! - Quantized actuation frames and real-time pacing

pub mod bands;
pub mod config;
pub mod error;
pub mod frame;
pub mod intensity;
pub mod logging;
pub mod pacer;
pub mod processor;
pub mod samples;
pub mod spectrum;

// --- Re-exports grouped by category ---

// Configuration
pub use config::{
    AnalysisConfig, BandConfig, LedConfig, MappingConfig, MappingPolicy, NormalizationScope,
    OutputConfig, PacerConfig, PatternKind, RelayConfig, SinkKind, SpectraConfig, Thresholds,
    TransportKind, WindowFunction,
};
pub use logging::LogConfig;

// Errors
pub use error::{CoreError, Result};

// Analysis
pub use bands::{Band, BandPartitioner, BandRanges, BandSlices};
pub use samples::{Frames, SampleBuffer};
pub use spectrum::{SpectralAnalyzer, Spectrum};

// Mapping
pub use frame::ActuationFrame;
pub use intensity::{
    energy_levels, map_value_to_intensity, parse_reading, pattern_weight, quantize, spread,
    EnergyLevels, IntensityMapper, FULL_SCALE,
};

// Pipeline
pub use pacer::{Pacer, PacerStats};
pub use processor::{BandReadings, FrameProcessor, ProcessedFrame};
