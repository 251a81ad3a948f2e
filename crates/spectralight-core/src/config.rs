//! Session configuration
//!
//! Everything the pipeline reads at startup lives here. The whole document is
//! loaded from TOML; every section falls back to its defaults, so an empty file
//! is a valid configuration.

use crate::bands::Band;
use crate::error::{CoreError, Result};
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Window applied to a frame before the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    /// No weighting (baseline behaviour, leaks across bins)
    #[default]
    Rectangular,
    /// Hann taper
    Hann,
}

/// Frame analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sample rate of the decoded buffer in Hz
    pub sample_rate: u32,
    /// Samples per frame (power of two)
    pub window_size: usize,
    /// Window function
    pub window: WindowFunction,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            window_size: 2048,
            window: WindowFunction::Rectangular,
        }
    }
}

impl AnalysisConfig {
    /// Real-time duration of one frame in seconds
    pub fn frame_seconds(&self) -> f64 {
        self.window_size as f64 / self.sample_rate as f64
    }

    /// Width of one spectrum bin in Hz
    pub fn bin_width_hz(&self) -> f32 {
        self.sample_rate as f32 / self.window_size as f32
    }
}

/// Band cutoff frequencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    /// Highest frequency counted as bass (inclusive)
    pub bass_cutoff_hz: f32,
    /// Highest frequency counted as mid (inclusive)
    pub mid_cutoff_hz: f32,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            bass_cutoff_hz: 200.0,
            mid_cutoff_hz: 2000.0,
        }
    }
}

/// LED layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedConfig {
    /// LEDs in each band group
    pub leds_per_group: usize,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self { leds_per_group: 5 }
    }
}

impl LedConfig {
    /// Total channel count over all three groups
    pub fn channel_count(&self) -> usize {
        self.leds_per_group * Band::ALL.len()
    }
}

/// Which intensity policy drives the LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MappingPolicy {
    /// Thermometer display from normalized band energy
    #[default]
    Energy,
    /// Thresholded reading spread with a spatial pattern
    Threshold,
}

/// Reference maximum used by the energy policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationScope {
    /// Maximum of the band's own leading bins
    Band,
    /// Maximum of the whole frame spectrum
    #[default]
    Frame,
}

/// Spatial pattern for spreading a scalar across a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Linear falloff from the centre
    Gradient,
    /// Quadratic bell centred on the group
    #[default]
    Bell,
    /// Decays with position index
    Progressive,
}

/// Clamp window for a band reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Reading that maps to 0.0
    pub min: f32,
    /// Reading that maps to 1.0
    pub max: f32,
}

impl Thresholds {
    /// Create a threshold window
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// Intensity mapping settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Active policy
    pub policy: MappingPolicy,
    /// Energy policy normalization reference
    pub normalization: NormalizationScope,
    /// Threshold policy pattern
    pub pattern: PatternKind,
    /// Response exponent for the threshold policy
    pub exponent: f32,
    /// Bass reading window
    pub bass: Thresholds,
    /// Mid reading window
    pub mid: Thresholds,
    /// Treble reading window
    pub treble: Thresholds,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            policy: MappingPolicy::Energy,
            normalization: NormalizationScope::Frame,
            pattern: PatternKind::Bell,
            exponent: 1.5,
            bass: Thresholds::new(150.0, 250.0),
            mid: Thresholds::new(50.0, 175.0),
            treble: Thresholds::new(25.0, 100.0),
        }
    }
}

impl MappingConfig {
    /// Threshold window for a band
    pub fn thresholds(&self, band: Band) -> Thresholds {
        match band {
            Band::Bass => self.bass,
            Band::Mid => self.mid,
            Band::Treble => self.treble,
        }
    }
}

/// Transport used for relayed delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// OSC messages over UDP
    #[default]
    Osc,
    /// In-process channel
    Loopback,
}

/// Relayed delivery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Consumer render tick
    pub poll_interval_ms: u64,
    /// Transport kind
    pub transport: TransportKind,
    /// Local address the consumer listens on
    pub bind_address: String,
    /// Address the producer publishes to
    pub peer_address: String,
    /// Topic carrying bass readings
    pub bass_topic: String,
    /// Topic carrying mid readings
    pub mid_topic: String,
    /// Topic carrying treble readings
    pub treble_topic: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            transport: TransportKind::Osc,
            bind_address: "0.0.0.0:9000".to_string(),
            peer_address: "127.0.0.1:9000".to_string(),
            bass_topic: "spectralight/bass".to_string(),
            mid_topic: "spectralight/mid".to_string(),
            treble_topic: "spectralight/treble".to_string(),
        }
    }
}

impl RelayConfig {
    /// Topic for a band
    pub fn topic(&self, band: Band) -> &str {
        match band {
            Band::Bass => &self.bass_topic,
            Band::Mid => &self.mid_topic,
            Band::Treble => &self.treble_topic,
        }
    }
}

/// Pacer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacerConfig {
    /// Subtract processing time from each sleep
    pub compensate_latency: bool,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            compensate_latency: true,
        }
    }
}

/// Actuation sink kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Bar graph through the log
    #[default]
    Log,
    /// DMX over Art-Net
    Artnet,
    /// In-memory only
    Memory,
}

/// Actuation output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Sink kind
    pub sink: SinkKind,
    /// Art-Net destination
    pub artnet_target: String,
    /// Art-Net universe
    pub universe: u16,
    /// First DMX address (1-512) used by channel 0
    pub start_address: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Log,
            artnet_target: "255.255.255.255:6454".to_string(),
            universe: 0,
            start_address: 1,
        }
    }
}

/// Complete configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpectraConfig {
    /// Frame analysis
    pub analysis: AnalysisConfig,
    /// Band cutoffs
    pub bands: BandConfig,
    /// LED layout
    pub leds: LedConfig,
    /// Intensity mapping
    pub mapping: MappingConfig,
    /// Relayed delivery
    pub relay: RelayConfig,
    /// Pacer
    pub pacer: PacerConfig,
    /// Actuation output
    pub output: OutputConfig,
    /// Logging
    pub logging: LogConfig,
}

impl SpectraConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SpectraConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;
        if analysis.sample_rate == 0 {
            return Err(CoreError::InvalidConfig(
                "sample_rate must be greater than 0".to_string(),
            ));
        }
        if analysis.window_size < 2 || !analysis.window_size.is_power_of_two() {
            return Err(CoreError::InvalidConfig(format!(
                "window_size must be a power of two >= 2, got {}",
                analysis.window_size
            )));
        }
        if self.leds.leds_per_group == 0 {
            return Err(CoreError::InvalidConfig(
                "leds_per_group must be at least 1".to_string(),
            ));
        }

        let bands = &self.bands;
        if !(bands.bass_cutoff_hz.is_finite() && bands.mid_cutoff_hz.is_finite()) {
            return Err(CoreError::InvalidConfig(
                "band cutoffs must be finite".to_string(),
            ));
        }
        if bands.bass_cutoff_hz < 0.0 || bands.mid_cutoff_hz < bands.bass_cutoff_hz {
            return Err(CoreError::InvalidConfig(format!(
                "cutoffs must satisfy 0 <= bass ({}) <= mid ({})",
                bands.bass_cutoff_hz, bands.mid_cutoff_hz
            )));
        }

        for band in Band::ALL {
            let t = self.mapping.thresholds(band);
            if !(t.min.is_finite() && t.max.is_finite()) || t.max <= t.min {
                return Err(CoreError::InvalidConfig(format!(
                    "{} thresholds must satisfy min < max, got {}..{}",
                    band, t.min, t.max
                )));
            }
        }
        if !self.mapping.exponent.is_finite() || self.mapping.exponent <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "exponent must be positive, got {}",
                self.mapping.exponent
            )));
        }
        if self.relay.poll_interval_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if !(1..=512).contains(&self.output.start_address) {
            return Err(CoreError::InvalidConfig(format!(
                "start_address must be within 1-512, got {}",
                self.output.start_address
            )));
        }

        Ok(())
    }
}
