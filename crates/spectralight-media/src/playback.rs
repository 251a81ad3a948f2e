//! Audible playback of a sample buffer on the default output device

use crate::error::{MediaError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use spectralight_core::SampleBuffer;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Plays a mono buffer until it runs out or is stopped
///
/// The stream stays on the thread that created it; drop the player to stop.
pub struct AudioPlayback {
    _stream: Stream,
    position: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
    total: usize,
}

impl AudioPlayback {
    /// Start playing `buffer` on the default output device
    pub fn start(buffer: &SampleBuffer) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MediaError::Playback("no output device available".to_string()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| MediaError::Playback(e.to_string()))?;

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let device_rate = u32::from(config.sample_rate);

        let shared = PlaybackState {
            samples: buffer.shared(),
            // Source samples advanced per device frame
            step: buffer.sample_rate() as f64 / device_rate.max(1) as f64,
            channels: config.channels as usize,
            position: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicBool::new(false)),
        };
        let position = Arc::clone(&shared.position);
        let finished = Arc::clone(&shared.finished);

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, shared)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, shared)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, shared)?,
            other => {
                return Err(MediaError::Playback(format!(
                    "unsupported output sample format {:?}",
                    other
                )))
            }
        };
        stream
            .play()
            .map_err(|e| MediaError::Playback(e.to_string()))?;

        info!(
            "Playback started: {:.1}s, device rate {} Hz",
            buffer.duration_secs(),
            device_rate
        );

        Ok(Self {
            _stream: stream,
            position,
            finished,
            total: buffer.len(),
        })
    }

    /// True until every sample has been handed to the device
    pub fn is_playing(&self) -> bool {
        !self.finished.load(Ordering::Acquire)
    }

    /// Flag raised when playback finishes, readable from other threads
    pub fn finished_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.finished)
    }

    /// Playback progress in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.position.load(Ordering::Relaxed) as f32 / self.total as f32).min(1.0)
    }
}

struct PlaybackState {
    samples: Arc<[f32]>,
    step: f64,
    channels: usize,
    position: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    state: PlaybackState,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut cursor = 0.0f64;
    let channels = state.channels.max(1);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let index = cursor as usize;
                    let value = match state.samples.get(index) {
                        Some(s) => *s,
                        None => {
                            state.finished.store(true, Ordering::Release);
                            0.0
                        }
                    };
                    for slot in frame.iter_mut() {
                        *slot = T::from_sample(value);
                    }
                    cursor += state.step;
                }
                state
                    .position
                    .store((cursor as usize).min(state.samples.len()), Ordering::Relaxed);
            },
            |err| error!("Audio output stream error: {}", err),
            None,
        )
        .map_err(|e| MediaError::Playback(e.to_string()))
}
