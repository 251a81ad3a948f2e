//! Band partitioning of a magnitude spectrum

use crate::config::BandConfig;
use crate::spectrum::Spectrum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Frequency band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    /// Up to the bass cutoff
    Bass,
    /// Between the bass and mid cutoffs
    Mid,
    /// Above the mid cutoff
    Treble,
}

impl Band {
    /// All bands in channel order
    pub const ALL: [Band; 3] = [Band::Bass, Band::Mid, Band::Treble];

    /// Position in channel order
    pub fn index(self) -> usize {
        match self {
            Band::Bass => 0,
            Band::Mid => 1,
            Band::Treble => 2,
        }
    }

    /// First actuation channel of this band's group
    pub fn group_offset(self, leds_per_group: usize) -> usize {
        self.index() * leds_per_group
    }

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Band::Bass => "bass",
            Band::Mid => "mid",
            Band::Treble => "treble",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bin ranges of the three bands for one spectrum length
///
/// The ranges are contiguous, ascending and together cover every bin once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandRanges {
    bass: Range<usize>,
    mid: Range<usize>,
    treble: Range<usize>,
}

impl BandRanges {
    /// Compute ranges for `bin_count` bins of `bin_width_hz` each
    pub fn compute(bin_count: usize, bin_width_hz: f32, config: &BandConfig) -> Self {
        let bass_end = bins_at_or_below(config.bass_cutoff_hz, bin_count, bin_width_hz);
        let mid_end =
            bins_at_or_below(config.mid_cutoff_hz, bin_count, bin_width_hz).max(bass_end);

        Self {
            bass: 0..bass_end,
            mid: bass_end..mid_end,
            treble: mid_end..bin_count,
        }
    }

    /// Range for one band
    pub fn range(&self, band: Band) -> Range<usize> {
        match band {
            Band::Bass => self.bass.clone(),
            Band::Mid => self.mid.clone(),
            Band::Treble => self.treble.clone(),
        }
    }
}

/// Number of leading bins whose frequency is <= `cutoff`
fn bins_at_or_below(cutoff: f32, bin_count: usize, bin_width_hz: f32) -> usize {
    if cutoff < 0.0 || bin_width_hz <= 0.0 {
        return 0;
    }
    // Estimate, then settle on the exact `k * width <= cutoff` boundary
    let mut end = ((cutoff / bin_width_hz).floor() as usize)
        .saturating_add(1)
        .min(bin_count);
    while end > 0 && (end - 1) as f32 * bin_width_hz > cutoff {
        end -= 1;
    }
    while end < bin_count && end as f32 * bin_width_hz <= cutoff {
        end += 1;
    }
    end
}

/// A spectrum split into bass, mid and treble slices
#[derive(Debug, Clone, Copy)]
pub struct BandSlices<'a> {
    /// Bass bins
    pub bass: &'a [f32],
    /// Mid bins
    pub mid: &'a [f32],
    /// Treble bins
    pub treble: &'a [f32],
}

impl<'a> BandSlices<'a> {
    /// Slice for one band
    pub fn get(&self, band: Band) -> &'a [f32] {
        match band {
            Band::Bass => self.bass,
            Band::Mid => self.mid,
            Band::Treble => self.treble,
        }
    }
}

/// Splits spectra by the configured cutoffs
#[derive(Debug, Clone)]
pub struct BandPartitioner {
    config: BandConfig,
}

impl BandPartitioner {
    /// Create a partitioner
    pub fn new(config: BandConfig) -> Self {
        Self { config }
    }

    /// Cutoff configuration
    pub fn config(&self) -> &BandConfig {
        &self.config
    }

    /// Ranges for a spectrum of this shape
    pub fn ranges(&self, bin_count: usize, bin_width_hz: f32) -> BandRanges {
        BandRanges::compute(bin_count, bin_width_hz, &self.config)
    }

    /// Split a spectrum into its three bands
    pub fn partition<'a>(&self, spectrum: &'a Spectrum) -> BandSlices<'a> {
        let ranges = self.ranges(spectrum.len(), spectrum.bin_width_hz());
        let mags = spectrum.magnitudes();
        BandSlices {
            bass: &mags[ranges.range(Band::Bass)],
            mid: &mags[ranges.range(Band::Mid)],
            treble: &mags[ranges.range(Band::Treble)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_ranges() -> BandRanges {
        BandRanges::compute(1025, 44100.0 / 2048.0, &BandConfig::default())
    }

    #[test]
    fn test_default_band_sizes() {
        let ranges = default_ranges();
        assert_eq!(ranges.range(Band::Bass), 0..10);
        assert_eq!(ranges.range(Band::Mid), 10..93);
        assert_eq!(ranges.range(Band::Treble), 93..1025);
    }

    #[test]
    fn test_cutoff_on_bin_is_inclusive() {
        let config = BandConfig {
            bass_cutoff_hz: 20.0,
            mid_cutoff_hz: 40.0,
        };
        let ranges = BandRanges::compute(11, 10.0, &config);
        assert_eq!(ranges.range(Band::Bass), 0..3);
        assert_eq!(ranges.range(Band::Mid), 3..5);
        assert_eq!(ranges.range(Band::Treble), 5..11);
    }

    #[test]
    fn test_cutoffs_above_nyquist() {
        let config = BandConfig {
            bass_cutoff_hz: 1.0e6,
            mid_cutoff_hz: 2.0e6,
        };
        let ranges = BandRanges::compute(9, 10.0, &config);
        assert_eq!(ranges.range(Band::Bass), 0..9);
        assert!(ranges.range(Band::Mid).is_empty());
        assert!(ranges.range(Band::Treble).is_empty());
    }

    #[test]
    fn test_partition_preserves_order() {
        let spectrum = Spectrum::new((0..11).map(|i| i as f32).collect(), 10.0);
        let partitioner = BandPartitioner::new(BandConfig {
            bass_cutoff_hz: 20.0,
            mid_cutoff_hz: 40.0,
        });
        let slices = partitioner.partition(&spectrum);
        assert_eq!(slices.bass, &[0.0, 1.0, 2.0]);
        assert_eq!(slices.mid, &[3.0, 4.0]);
        assert_eq!(slices.get(Band::Treble).first(), Some(&5.0));
    }

    #[test]
    fn test_group_offsets() {
        assert_eq!(Band::Bass.group_offset(5), 0);
        assert_eq!(Band::Mid.group_offset(5), 5);
        assert_eq!(Band::Treble.group_offset(5), 10);
        assert_eq!(Band::Treble.to_string(), "treble");
    }
}
