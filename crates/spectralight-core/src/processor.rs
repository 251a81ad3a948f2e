//! Per-frame pipeline: analyze, partition, map

use crate::bands::{Band, BandPartitioner};
use crate::config::SpectraConfig;
use crate::error::Result;
use crate::frame::ActuationFrame;
use crate::intensity::IntensityMapper;
use crate::spectrum::{SpectralAnalyzer, Spectrum};

/// Summed magnitude per band
///
/// This is the scalar a producer publishes for each band.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandReadings {
    values: [f32; 3],
}

impl BandReadings {
    pub fn new(bass: f32, mid: f32, treble: f32) -> Self {
        Self {
            values: [bass, mid, treble],
        }
    }

    pub fn get(&self, band: Band) -> f32 {
        self.values[band.index()]
    }

    /// Reading as published: integer decimal text, truncated toward zero
    pub fn payload(&self, band: Band) -> String {
        let value = self.get(band);
        if value.is_finite() {
            (value.trunc() as i64).to_string()
        } else {
            "0".to_string()
        }
    }
}

/// Result of processing one frame
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub spectrum: Spectrum,
    pub readings: BandReadings,
    pub actuation: ActuationFrame,
}

/// Runs analysis and mapping for a stream of frames
pub struct FrameProcessor {
    analyzer: SpectralAnalyzer,
    partitioner: BandPartitioner,
    mapper: IntensityMapper,
}

impl FrameProcessor {
    pub fn new(config: &SpectraConfig) -> Self {
        Self {
            analyzer: SpectralAnalyzer::new(config.analysis.clone()),
            partitioner: BandPartitioner::new(config.bands.clone()),
            mapper: IntensityMapper::new(config.mapping.clone(), config.leds.leds_per_group),
        }
    }

    pub fn window_size(&self) -> usize {
        self.analyzer.config().window_size
    }

    pub fn frames_processed(&self) -> u64 {
        self.analyzer.frame_count()
    }

    pub fn mapper(&self) -> &IntensityMapper {
        &self.mapper
    }

    /// Analyze one frame and map it to an actuation frame
    pub fn process(&mut self, frame: &[f32]) -> Result<ProcessedFrame> {
        let spectrum = self.analyzer.analyze(frame)?;
        let peak = spectrum.peak();
        let slices = self.partitioner.partition(&spectrum);

        let mut actuation = ActuationFrame::dark(self.mapper.leds_per_group());
        for band in Band::ALL {
            let bins = slices.get(band);
            actuation.set_group(band, &self.mapper.map_bins(band, bins, peak));
        }

        let sum = |bins: &[f32]| bins.iter().copied().filter(|v| v.is_finite()).sum::<f32>();
        let readings = BandReadings::new(sum(slices.bass), sum(slices.mid), sum(slices.treble));

        Ok(ProcessedFrame {
            spectrum,
            readings,
            actuation,
        })
    }
}
