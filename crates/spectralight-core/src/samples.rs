//! Sample source and frame windowing

use std::sync::Arc;

/// Immutable mono sample sequence at a fixed rate
///
/// Cloning shares the underlying samples.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap decoded samples
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// All samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Shared handle to the samples (for playback threads)
    pub fn shared(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when there are no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Non-overlapping frames of `window_size` samples
    pub fn frames(&self, window_size: usize) -> Frames<'_> {
        Frames::new(&self.samples, window_size)
    }

    /// Number of complete frames
    pub fn frame_count(&self, window_size: usize) -> usize {
        if window_size == 0 {
            0
        } else {
            self.samples.len() / window_size
        }
    }
}

/// Iterator over complete, non-overlapping frames
///
/// A trailing partial frame is never yielded.
pub struct Frames<'a> {
    inner: std::slice::ChunksExact<'a, f32>,
}

impl<'a> Frames<'a> {
    /// Slice `samples` into frames of `window_size`
    pub fn new(samples: &'a [f32], window_size: usize) -> Self {
        // chunks_exact panics on zero; an empty slice yields nothing instead
        let (samples, size) = if window_size == 0 {
            (&samples[..0], 1)
        } else {
            (samples, window_size)
        };
        Self {
            inner: samples.chunks_exact(size),
        }
    }

    /// Samples left over after the last complete frame
    pub fn remainder(&self) -> &'a [f32] {
        self.inner.remainder()
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a [f32];

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Frames<'_> {}
