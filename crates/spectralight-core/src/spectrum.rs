//! Spectral analyzer - FFT magnitude spectrum per frame
//!
//! Uses rustfft directly with a planned forward transform. Only the
//! non-negative frequency half of the output is kept, so a frame of W samples
//! produces W/2 + 1 magnitudes.

use crate::config::{AnalysisConfig, WindowFunction};
use crate::error::{CoreError, Result};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use tracing::{debug, trace};

/// Magnitude spectrum of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    magnitudes: Vec<f32>,
    bin_width_hz: f32,
}

impl Spectrum {
    /// Build a spectrum from raw magnitudes
    pub fn new(magnitudes: Vec<f32>, bin_width_hz: f32) -> Self {
        Self {
            magnitudes,
            bin_width_hz,
        }
    }

    /// Magnitudes in ascending frequency order
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    /// True when the spectrum has no bins
    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Width of a bin in Hz
    pub fn bin_width_hz(&self) -> f32 {
        self.bin_width_hz
    }

    /// Centre frequency of bin `k`
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.bin_width_hz
    }

    /// Largest magnitude (0.0 for an empty spectrum)
    pub fn peak(&self) -> f32 {
        self.magnitudes.iter().copied().fold(0.0f32, f32::max)
    }

    /// Index of the largest magnitude
    pub fn peak_bin(&self) -> Option<usize> {
        self.magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }
}

/// Frame-by-frame spectral analyzer
pub struct SpectralAnalyzer {
    /// FFT instance
    fft: Arc<dyn Fft<f32>>,

    /// Configuration
    config: AnalysisConfig,

    /// FFT complex buffer
    fft_buffer: Vec<Complex<f32>>,

    /// FFT scratch buffer
    scratch_buffer: Vec<Complex<f32>>,

    /// Window coefficients (all 1.0 for rectangular)
    window: Vec<f32>,

    /// Frames analyzed so far
    frame_count: u64,
}

impl SpectralAnalyzer {
    /// Create an analyzer for the configured window size
    pub fn new(config: AnalysisConfig) -> Self {
        let fft_size = config.window_size;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();
        let window = window_coefficients(config.window, fft_size);

        debug!(
            "SpectralAnalyzer created: sample_rate={}, window_size={}, window={:?}",
            config.sample_rate, fft_size, config.window
        );

        Self {
            fft,
            config,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch_buffer: vec![Complex::new(0.0, 0.0); scratch_len],
            window,
            frame_count: 0,
        }
    }

    /// Number of bins produced per frame
    pub fn bin_count(&self) -> usize {
        self.config.window_size / 2 + 1
    }

    /// Analysis configuration
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Frames analyzed so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Compute the magnitude spectrum of one frame
    ///
    /// The frame must be exactly `window_size` samples; shorter trailing
    /// frames are the caller's to drop.
    pub fn analyze(&mut self, frame: &[f32]) -> Result<Spectrum> {
        if frame.len() != self.config.window_size {
            return Err(CoreError::FrameLength {
                expected: self.config.window_size,
                actual: frame.len(),
            });
        }

        self.frame_count += 1;

        for (slot, (&sample, &w)) in self
            .fft_buffer
            .iter_mut()
            .zip(frame.iter().zip(self.window.iter()))
        {
            // NaN/Inf would poison every bin
            let sample = if sample.is_finite() { sample } else { 0.0 };
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch_buffer);

        let magnitudes: Vec<f32> = self.fft_buffer[..self.bin_count()]
            .iter()
            .map(|c| c.norm())
            .collect();

        if self.frame_count % 100 == 0 {
            trace!("Frame #{}: peak={:.3}", self.frame_count, {
                magnitudes.iter().copied().fold(0.0f32, f32::max)
            });
        }

        Ok(Spectrum::new(magnitudes, self.config.bin_width_hz()))
    }
}

fn window_coefficients(window: WindowFunction, size: usize) -> Vec<f32> {
    match window {
        WindowFunction::Rectangular => vec![1.0; size],
        WindowFunction::Hann => {
            let denom = (size.max(2) - 1) as f32;
            (0..size)
                .map(|i| {
                    let t = i as f32 / denom;
                    0.5 * (1.0 - (2.0 * std::f32::consts::PI * t).cos())
                })
                .collect()
        }
    }
}
