//! SpectraLight Media - Audio loading and playback
//!
//! This crate turns an audio file into the immutable mono `SampleBuffer` the
//! analysis pipeline consumes:
//! - symphonia probe/decode for any supported container and codec
//! - channel down-mix and rubato resampling to the analysis rate
//! - optional audible playback through cpal (`playback` feature)

pub mod decoder;
pub mod error;
#[cfg(feature = "playback")]
pub mod playback;

pub use decoder::{decode_to_mono, load_samples, peak_normalize, resample, DecodeOptions, MonoAudio};
pub use error::{MediaError, Result};
#[cfg(feature = "playback")]
pub use playback::AudioPlayback;
