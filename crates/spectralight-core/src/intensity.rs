//! Intensity mapping
//!
//! Two policies reduce a band to per-LED brightness:
//!
//! - **Energy**: thermometer display. The first N bins are normalized against a
//!   reference maximum, summed into a `total_energy` figure and a variable
//!   number of leading LEDs are lit at a tiered brightness.
//! - **Threshold**: a scalar reading is clamped to the band's window,
//!   normalized, shaped by an exponent and spread over the group with a
//!   spatial pattern.
//!
//! All outputs are quantized to `0..=FULL_SCALE`.

use crate::bands::Band;
use crate::config::{MappingConfig, MappingPolicy, NormalizationScope, PatternKind, Thresholds};
use tracing::warn;

/// Full-scale 12-bit brightness
pub const FULL_SCALE: u16 = 4095;

/// Energy headroom divisor used by the thermometer display
const ENERGY_HEADROOM: f32 = 0.7;

/// Quantize an intensity in [0, 1] to 12-bit brightness
///
/// Values outside the range are clamped; NaN maps to 0.
pub fn quantize(intensity: f32) -> u16 {
    if intensity.is_nan() {
        return 0;
    }
    (intensity.clamp(0.0, 1.0) * FULL_SCALE as f32) as u16
}

/// Brightness tier for a thermometer level
pub fn tier_brightness(total_energy: f32) -> u16 {
    if total_energy > 0.8 {
        FULL_SCALE
    } else if total_energy > 0.6 {
        (FULL_SCALE as f32 * 0.75) as u16
    } else if total_energy > 0.4 {
        (FULL_SCALE as f32 * 0.5) as u16
    } else {
        (FULL_SCALE as f32 * 0.2) as u16
    }
}

/// Outcome of the energy policy for one group
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyLevels {
    /// Normalized energy (1.0 is "full" at 70% headroom; may exceed 1.0)
    pub total_energy: f32,
    /// Number of leading LEDs lit
    pub active: usize,
    /// Brightness of each LED in the group
    pub brightness: Vec<u16>,
}

/// Thermometer display for one group
///
/// `values` are the band's bins; only the first `n` are used. `reference` is
/// the normalization maximum; `None` uses the largest of those first `n`.
/// A reference of zero or below divides by one instead.
pub fn energy_levels(values: &[f32], n: usize, reference: Option<f32>) -> EnergyLevels {
    if n == 0 {
        return EnergyLevels {
            total_energy: 0.0,
            active: 0,
            brightness: Vec::new(),
        };
    }

    let head = &values[..values.len().min(n)];
    let reference = reference.unwrap_or_else(|| max_finite(head));
    let divisor = if reference.is_finite() && reference > 0.0 {
        reference
    } else {
        1.0
    };

    let full = FULL_SCALE as f32;
    let sum: f32 = head
        .iter()
        .map(|v| if v.is_finite() { v / divisor * full } else { 0.0 })
        .sum();

    let total_energy = sum / (n as f32 * full * ENERGY_HEADROOM);
    // Tolerance absorbs rounding when a level lands exactly on an LED boundary
    let active = ((total_energy * n as f32 + 1e-4).floor().max(0.0) as usize).min(n);
    let tier = tier_brightness(total_energy);

    let brightness = (0..n).map(|i| if i < active { tier } else { 0 }).collect();

    EnergyLevels {
        total_energy,
        active,
        brightness,
    }
}

/// Clamp, normalize and shape a scalar reading
///
/// Returns 0.0 at `min`, 1.0 at `max`, non-decreasing in between. Non-finite
/// readings map to 0.0.
pub fn map_value_to_intensity(value: f32, thresholds: Thresholds, exponent: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let span = thresholds.max - thresholds.min;
    if span <= 0.0 {
        return if value >= thresholds.max { 1.0 } else { 0.0 };
    }
    let clamped = value.clamp(thresholds.min, thresholds.max);
    let normalized = (clamped - thresholds.min) / span;
    normalized.powf(exponent).clamp(0.0, 1.0)
}

/// Weight of LED `i` in a group of `n` for a pattern
pub fn pattern_weight(pattern: PatternKind, i: usize, n: usize) -> f32 {
    if n <= 1 {
        return 1.0;
    }
    let mid = (n - 1) as f32 / 2.0;
    let distance = (i as f32 - mid).abs() / mid;
    match pattern {
        PatternKind::Bell => 1.0 - distance * distance,
        PatternKind::Gradient => 1.0 - 0.5 * distance,
        PatternKind::Progressive => 1.0 - (i as f32 / n as f32) * 0.5,
    }
}

/// Spread an intensity over `n` LEDs, clamped to [0, 1]
pub fn spread(intensity: f32, pattern: PatternKind, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| (intensity * pattern_weight(pattern, i, n)).clamp(0.0, 1.0))
        .collect()
}

/// Parse a relayed reading
///
/// Anything that is not a finite decimal number is logged and read as 0.0.
pub fn parse_reading(payload: &[u8]) -> f32 {
    let text = match std::str::from_utf8(payload) {
        Ok(text) => text.trim(),
        Err(_) => {
            warn!("Reading is not UTF-8 ({} bytes), using 0", payload.len());
            return 0.0;
        }
    };

    match text.parse::<f32>() {
        Ok(value) if value.is_finite() => value,
        Ok(value) => {
            warn!("Reading '{}' is not finite ({}), using 0", text, value);
            0.0
        }
        Err(e) => {
            warn!("Could not parse reading '{}': {}, using 0", text, e);
            0.0
        }
    }
}

fn max_finite(values: &[f32]) -> f32 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f32, f32::max)
}

/// Maps band data to group brightness with the configured policy
#[derive(Debug, Clone)]
pub struct IntensityMapper {
    config: MappingConfig,
    leds_per_group: usize,
}

impl IntensityMapper {
    /// Create a mapper for groups of `leds_per_group`
    pub fn new(config: MappingConfig, leds_per_group: usize) -> Self {
        Self {
            config,
            leds_per_group,
        }
    }

    /// Mapping configuration
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// LEDs per group
    pub fn leds_per_group(&self) -> usize {
        self.leds_per_group
    }

    /// Map a band's bins from a local analysis
    ///
    /// `frame_peak` is the largest magnitude in the whole spectrum; it is the
    /// reference when normalizing at frame scope.
    pub fn map_bins(&self, band: Band, bins: &[f32], frame_peak: f32) -> Vec<u16> {
        let n = self.leds_per_group;
        match self.config.policy {
            MappingPolicy::Energy => {
                let reference = match self.config.normalization {
                    NormalizationScope::Band => None,
                    NormalizationScope::Frame => Some(frame_peak),
                };
                energy_levels(bins, n, reference).brightness
            }
            MappingPolicy::Threshold => {
                let reading: f32 = bins.iter().copied().filter(|v| v.is_finite()).sum();
                self.threshold_levels(band, reading)
            }
        }
    }

    /// Map a relayed scalar reading
    pub fn map_reading(&self, band: Band, reading: f32) -> Vec<u16> {
        let n = self.leds_per_group;
        match self.config.policy {
            MappingPolicy::Energy => {
                let reading = if reading.is_finite() { reading.max(0.0) } else { 0.0 };
                let spread_values: Vec<f32> = (0..n)
                    .map(|i| reading * pattern_weight(PatternKind::Gradient, i, n))
                    .collect();
                energy_levels(&spread_values, n, None).brightness
            }
            MappingPolicy::Threshold => self.threshold_levels(band, reading),
        }
    }

    fn threshold_levels(&self, band: Band, reading: f32) -> Vec<u16> {
        let intensity =
            map_value_to_intensity(reading, self.config.thresholds(band), self.config.exponent);
        spread(intensity, self.config.pattern, self.leds_per_group)
            .into_iter()
            .map(quantize)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_bounds() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), 4095);
        assert_eq!(quantize(2.0), 4095);
        assert_eq!(quantize(-1.0), 0);
        assert_eq!(quantize(f32::NAN), 0);
        assert_eq!(quantize(0.5), 2047);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(tier_brightness(0.9), 4095);
        assert_eq!(tier_brightness(0.7), 3071);
        assert_eq!(tier_brightness(0.5), 2047);
        assert_eq!(tier_brightness(0.1), 819);
    }

    #[test]
    fn test_energy_all_zero_is_dark() {
        let levels = energy_levels(&[0.0; 10], 5, None);
        assert_eq!(levels.active, 0);
        assert_eq!(levels.brightness, vec![0; 5]);

        let levels = energy_levels(&[0.0; 10], 5, Some(0.0));
        assert_eq!(levels.brightness, vec![0; 5]);
    }

    #[test]
    fn test_energy_empty_is_dark() {
        let levels = energy_levels(&[], 5, None);
        assert_eq!(levels.brightness, vec![0; 5]);
        assert_eq!(levels.total_energy, 0.0);
    }

    #[test]
    fn test_energy_flat_band_is_full() {
        // Equal bins normalize to full scale: total = 1 / 0.7
        let levels = energy_levels(&[3.0; 8], 5, None);
        assert!(levels.total_energy > 0.8);
        assert_eq!(levels.active, 5);
        assert_eq!(levels.brightness, vec![4095; 5]);
    }

    #[test]
    fn test_energy_partial_thermometer() {
        // One spike: total = 1 / (5 * 0.7) = 0.2857 -> floor(1.43) = 1 lit at the dim tier
        let levels = energy_levels(&[1.0, 0.0, 0.0, 0.0, 0.0], 5, None);
        assert_eq!(levels.active, 1);
        assert_eq!(levels.brightness, vec![819, 0, 0, 0, 0]);
    }

    #[test]
    fn test_energy_frame_reference() {
        // Against a larger reference the same band reads quieter
        let band = energy_levels(&[2.0; 5], 5, None);
        let frame = energy_levels(&[2.0; 5], 5, Some(20.0));
        assert!(frame.total_energy < band.total_energy);
        assert_eq!(frame.active, 0);
    }

    #[test]
    fn test_map_value_endpoints() {
        let t = Thresholds::new(150.0, 250.0);
        assert_eq!(map_value_to_intensity(150.0, t, 1.5), 0.0);
        assert_eq!(map_value_to_intensity(250.0, t, 1.5), 1.0);
        assert_eq!(map_value_to_intensity(10.0, t, 1.5), 0.0);
        assert_eq!(map_value_to_intensity(1000.0, t, 1.5), 1.0);
        assert_eq!(map_value_to_intensity(f32::NAN, t, 1.5), 0.0);

        let half = map_value_to_intensity(200.0, t, 1.5);
        assert!((half - 0.5f32.powf(1.5)).abs() < 1e-6);
    }

    #[test]
    fn test_pattern_weights() {
        let bell: Vec<f32> = (0..5).map(|i| pattern_weight(PatternKind::Bell, i, 5)).collect();
        assert_eq!(bell, vec![0.0, 0.75, 1.0, 0.75, 0.0]);

        let gradient: Vec<f32> = (0..5)
            .map(|i| pattern_weight(PatternKind::Gradient, i, 5))
            .collect();
        assert_eq!(gradient, vec![0.5, 0.75, 1.0, 0.75, 0.5]);

        for (i, expected) in [1.0, 0.9, 0.8, 0.7, 0.6].into_iter().enumerate() {
            let weight = pattern_weight(PatternKind::Progressive, i, 5);
            assert!((weight - expected).abs() < 1e-6);
        }

        assert_eq!(pattern_weight(PatternKind::Bell, 0, 1), 1.0);
    }

    #[test]
    fn test_parse_reading_guards() {
        assert_eq!(parse_reading(b"42"), 42.0);
        assert_eq!(parse_reading(b" 12.5\n"), 12.5);
        assert_eq!(parse_reading(b"abc"), 0.0);
        assert_eq!(parse_reading(b""), 0.0);
        assert_eq!(parse_reading(b"NaN"), 0.0);
        assert_eq!(parse_reading(b"inf"), 0.0);
        assert_eq!(parse_reading(&[0xff, 0xfe]), 0.0);
    }

    #[test]
    fn test_threshold_policy_reading() {
        let config = MappingConfig {
            policy: MappingPolicy::Threshold,
            ..Default::default()
        };
        let mapper = IntensityMapper::new(config, 5);

        assert_eq!(mapper.map_reading(Band::Bass, 100.0), vec![0; 5]);
        assert_eq!(mapper.map_reading(Band::Bass, 250.0), vec![0, 3071, 4095, 3071, 0]);
    }

    #[test]
    fn test_energy_policy_relayed_reading() {
        let mapper = IntensityMapper::new(MappingConfig::default(), 5);

        // Gradient sums to 3.5 over 5 LEDs, exactly the 70% headroom
        assert_eq!(mapper.map_reading(Band::Mid, 1234.0), vec![4095; 5]);
        assert_eq!(mapper.map_reading(Band::Mid, 0.0), vec![0; 5]);
        assert_eq!(mapper.map_reading(Band::Mid, -5.0), vec![0; 5]);
    }
}
