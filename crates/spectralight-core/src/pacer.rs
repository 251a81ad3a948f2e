//! Real-time cadence for frame processing
//!
//! Each frame represents `window_size / sample_rate` seconds of audio. After a
//! frame is processed the pacer sleeps for what is left of that duration, so
//! lights stay aligned with playback over long sessions. With compensation
//! disabled it sleeps the full duration every frame (and drifts by the
//! processing time per frame).

use crate::config::{AnalysisConfig, PacerConfig};
use std::time::{Duration, Instant};
use tracing::debug;

/// Pacer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PacerStats {
    pub paced_frames: u64,
    /// Frames whose processing took longer than the frame duration
    pub overruns: u64,
    pub total_sleep: Duration,
    pub total_processing: Duration,
}

/// Sleeps between frames to hold real-time cadence
#[derive(Debug)]
pub struct Pacer {
    frame_duration: Duration,
    compensate_latency: bool,
    frame_start: Instant,
    stats: PacerStats,
}

impl Pacer {
    pub fn new(frame_duration: Duration, compensate_latency: bool) -> Self {
        Self {
            frame_duration,
            compensate_latency,
            frame_start: Instant::now(),
            stats: PacerStats::default(),
        }
    }

    /// Pacer for the configured frame size and rate
    pub fn from_config(analysis: &AnalysisConfig, pacer: &PacerConfig) -> Self {
        Self::new(
            Duration::from_secs_f64(analysis.frame_seconds()),
            pacer.compensate_latency,
        )
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Mark the start of a frame's processing
    pub fn start_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    /// How long to sleep after `processing` time was spent on a frame
    pub fn sleep_duration(&self, processing: Duration) -> Duration {
        if !self.compensate_latency {
            return self.frame_duration;
        }
        self.frame_duration.saturating_sub(processing)
    }

    /// Sleep out the remainder of the current frame
    ///
    /// Returns the time slept.
    pub fn wait(&mut self) -> Duration {
        let elapsed = self.frame_start.elapsed();
        let sleep = self.sleep_duration(elapsed);

        self.stats.paced_frames += 1;
        self.stats.total_processing += elapsed;
        if elapsed > self.frame_duration {
            self.stats.overruns += 1;
            debug!(
                "Frame overrun: {:.2}ms > {:.2}ms",
                elapsed.as_secs_f64() * 1000.0,
                self.frame_duration.as_secs_f64() * 1000.0
            );
        }

        if !sleep.is_zero() {
            std::thread::sleep(sleep);
            self.stats.total_sleep += sleep;
        }
        self.frame_start = Instant::now();
        sleep
    }

    pub fn stats(&self) -> PacerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compensated_sleep() {
        let pacer = Pacer::new(Duration::from_millis(46), true);
        assert_eq!(
            pacer.sleep_duration(Duration::from_millis(6)),
            Duration::from_millis(40)
        );
        assert_eq!(pacer.sleep_duration(Duration::from_millis(60)), Duration::ZERO);
    }

    #[test]
    fn test_uncompensated_sleep() {
        let pacer = Pacer::new(Duration::from_millis(46), false);
        assert_eq!(
            pacer.sleep_duration(Duration::from_millis(6)),
            Duration::from_millis(46)
        );
    }

    #[test]
    fn test_from_config() {
        let pacer = Pacer::from_config(&AnalysisConfig::default(), &PacerConfig::default());
        let expected = 2048.0 / 44100.0;
        assert!((pacer.frame_duration().as_secs_f64() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_wait_holds_cadence() {
        let mut pacer = Pacer::new(Duration::from_millis(20), true);
        let start = Instant::now();
        for _ in 0..3 {
            pacer.start_frame();
            std::thread::sleep(Duration::from_millis(5));
            pacer.wait();
        }
        let total = start.elapsed();
        assert!(total >= Duration::from_millis(60));
        assert!(total < Duration::from_millis(200));
        assert_eq!(pacer.stats().paced_frames, 3);
        assert_eq!(pacer.stats().overruns, 0);
    }
}
