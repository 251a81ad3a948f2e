//! Session runners and cleanup guards
//!
//! Each mode is one foreground loop that checks a [`ShutdownSignal`] every
//! iteration. Outputs are released by guards on every exit path:
//! [`ActuationGuard`] zeroes all channels, [`TransportGuard`] disconnects.

use crate::error::ControlError;
use crate::relay::{RelayConsumer, RelayPublisher};
use crate::sink::ActuationSink;
use crate::transport::{LoopbackTransport, Transport};
use crate::Result;
use spectralight_core::{
    Band, CoreError, FrameProcessor, IntensityMapper, Pacer, SampleBuffer, SpectraConfig,
};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

/// Cooperative cancellation flag shared by every loop in a session
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        if !self.0.swap(true, Ordering::AcqRel) {
            info!("Shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Owns a sink and turns every channel off when dropped
pub struct ActuationGuard<S: ActuationSink> {
    sink: S,
}

impl<S: ActuationSink> ActuationGuard<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S: ActuationSink> Deref for ActuationGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.sink
    }
}

impl<S: ActuationSink> DerefMut for ActuationGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: ActuationSink> Drop for ActuationGuard<S> {
    fn drop(&mut self) {
        match self.sink.zero_all() {
            Ok(()) => info!("All {} channels zeroed", self.sink.channel_count()),
            Err(e) => error!("Failed to zero LED channels: {}", e),
        }
    }
}

/// Owns a transport and disconnects it when dropped
pub struct TransportGuard<T: Transport> {
    transport: T,
}

impl<T: Transport> TransportGuard<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: Transport> Deref for TransportGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> DerefMut for TransportGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> Drop for TransportGuard<T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.disconnect() {
            error!("Transport disconnect failed: {}", e);
        }
    }
}

/// Per-session counters, logged at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_analyzed: u64,
    pub frames_rendered: u64,
    pub published: u64,
    pub overruns: u64,
}

impl SessionStats {
    pub fn log_summary(&self, mode: &str) {
        info!(
            "{} session: {} frames analyzed, {} rendered, {} readings published, {} overruns",
            mode, self.frames_analyzed, self.frames_rendered, self.published, self.overruns
        );
    }
}

fn check_sample_rate(buffer: &SampleBuffer, config: &SpectraConfig) -> Result<()> {
    if buffer.sample_rate() != config.analysis.sample_rate {
        return Err(ControlError::Core(CoreError::InvalidConfig(format!(
            "buffer is {} Hz but analysis expects {} Hz",
            buffer.sample_rate(),
            config.analysis.sample_rate
        ))));
    }
    Ok(())
}

/// Analyze frame by frame and drive the sink directly
///
/// Stops at the end of the buffer, on shutdown, or when `keep_going`
/// returns false (e.g. audible playback finished).
pub fn run_direct<S, F>(
    buffer: &SampleBuffer,
    config: &SpectraConfig,
    sink: &mut S,
    shutdown: &ShutdownSignal,
    mut keep_going: F,
) -> Result<SessionStats>
where
    S: ActuationSink + ?Sized,
    F: FnMut() -> bool,
{
    check_sample_rate(buffer, config)?;

    let mut processor = FrameProcessor::new(config);
    let mut pacer = Pacer::from_config(&config.analysis, &config.pacer);
    let mut stats = SessionStats::default();

    let frames = buffer.frames(processor.window_size());
    info!(
        "Direct session: {} frames of {:.1}ms",
        frames.len(),
        pacer.frame_duration().as_secs_f64() * 1000.0
    );

    for frame in frames {
        if shutdown.is_triggered() {
            break;
        }
        if !keep_going() {
            info!("Playback finished");
            break;
        }

        pacer.start_frame();
        let processed = processor.process(frame)?;
        stats.frames_analyzed += 1;

        sink.apply(&processed.actuation)?;
        stats.frames_rendered += 1;

        debug!(
            "Frame {}: bass {} / mid {} / treble {}",
            stats.frames_analyzed,
            processed.readings.payload(Band::Bass),
            processed.readings.payload(Band::Mid),
            processed.readings.payload(Band::Treble),
        );
        pacer.wait();
    }

    stats.overruns = pacer.stats().overruns;
    Ok(stats)
}

/// Analyze frame by frame and publish the band readings
pub fn run_publisher<T, F>(
    buffer: &SampleBuffer,
    config: &SpectraConfig,
    transport: &T,
    shutdown: &ShutdownSignal,
    mut keep_going: F,
) -> Result<SessionStats>
where
    T: Transport + ?Sized,
    F: FnMut() -> bool,
{
    check_sample_rate(buffer, config)?;

    let mut processor = FrameProcessor::new(config);
    let mut pacer = Pacer::from_config(&config.analysis, &config.pacer);
    let mut publisher = RelayPublisher::new(&config.relay);
    let mut stats = SessionStats::default();

    info!(
        "Publishing {} frames to {}, {}, {}",
        buffer.frame_count(processor.window_size()),
        config.relay.bass_topic,
        config.relay.mid_topic,
        config.relay.treble_topic
    );

    for frame in buffer.frames(processor.window_size()) {
        if shutdown.is_triggered() {
            break;
        }
        if !keep_going() {
            info!("Playback finished");
            break;
        }

        pacer.start_frame();
        let processed = processor.process(frame)?;
        stats.frames_analyzed += 1;

        publisher.publish(transport, &processed.readings);
        pacer.wait();
    }

    if publisher.failed() > 0 {
        warn!("{} publishes failed", publisher.failed());
    }
    stats.published = publisher.published();
    stats.overruns = pacer.stats().overruns;
    Ok(stats)
}

/// Producer and consumer in one process over a loopback transport
///
/// The producer runs on its own thread; the consumer renders on this one
/// until the producer finishes or shutdown is requested.
pub fn run_loopback<S, F>(
    buffer: &SampleBuffer,
    config: &SpectraConfig,
    sink: &mut S,
    shutdown: &ShutdownSignal,
    keep_going: F,
) -> Result<SessionStats>
where
    S: ActuationSink + ?Sized,
    F: FnMut() -> bool + Send + 'static,
{
    check_sample_rate(buffer, config)?;

    let (producer_end, consumer_end) = LoopbackTransport::pair();
    let mut consumer_end = TransportGuard::new(consumer_end);

    let mapper = IntensityMapper::new(config.mapping.clone(), config.leds.leds_per_group);
    let mut consumer = RelayConsumer::new(&config.relay, mapper);
    consumer.attach(&mut *consumer_end)?;

    let producer_done = ShutdownSignal::new();
    let abort = ShutdownSignal::new();
    let producer = {
        let buffer = buffer.clone();
        let config = config.clone();
        let shutdown = shutdown.clone();
        let done = producer_done.clone();
        let abort = abort.clone();
        let mut keep_going = keep_going;
        thread::Builder::new()
            .name("relay-producer".to_string())
            .spawn(move || {
                let producer_end = TransportGuard::new(producer_end);
                let result = run_publisher(&buffer, &config, &*producer_end, &shutdown, || {
                    !abort.is_triggered() && keep_going()
                });
                done.trigger();
                result
            })?
    };

    let mut consumed = consumer.run(sink, &producer_done).map(|_| ());
    if consumed.is_err() {
        abort.trigger();
    } else if !shutdown.is_triggered() {
        // Readings that landed after the last tick
        consumed = consumer.poll_once(sink).map(|_| ());
    }

    let produced = producer
        .join()
        .map_err(|_| ControlError::Transport("relay-producer thread panicked".to_string()))?;
    consumed?;

    let mut stats = produced?;
    stats.frames_rendered = consumer.stats().renders;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use spectralight_core::MappingPolicy;

    fn tone(frames: usize) -> SampleBuffer {
        let samples: Vec<f32> = (0..frames * 2048)
            .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 44100.0).sin())
            .collect();
        SampleBuffer::new(samples, 44100)
    }

    #[test]
    fn test_signal_is_shared() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_triggered());
        signal.trigger();
        assert!(clone.is_triggered());
    }

    #[test]
    fn test_guard_zeroes_on_drop() {
        let sink = MemorySink::new(6);
        let handle = sink.handle();
        {
            let mut guard = ActuationGuard::new(sink);
            guard.set(0, 4095).unwrap();
            guard.flush().unwrap();
        }
        assert_eq!(handle.last_flushed(), Some(vec![0; 6]));
    }

    #[test]
    fn test_direct_renders_every_frame() {
        let mut sink = MemorySink::new(15);
        let handle = sink.handle();
        let stats = run_direct(
            &tone(3),
            &SpectraConfig::default(),
            &mut sink,
            &ShutdownSignal::new(),
            || true,
        )
        .unwrap();

        assert_eq!(stats.frames_analyzed, 3);
        assert_eq!(stats.frames_rendered, 3);
        assert_eq!(handle.flush_count(), 3);
        // 100 Hz lights bass only
        let last = handle.last_flushed().unwrap();
        assert!(last[0] > 0);
        assert!(last[5..].iter().all(|v| *v == 0));
    }

    #[test]
    fn test_direct_stops_when_playback_ends() {
        let mut sink = MemorySink::new(15);
        let mut remaining = 1;
        let stats = run_direct(
            &tone(4),
            &SpectraConfig::default(),
            &mut sink,
            &ShutdownSignal::new(),
            move || {
                remaining -= 1;
                remaining >= 0
            },
        )
        .unwrap();
        assert_eq!(stats.frames_analyzed, 1);
    }

    #[test]
    fn test_sample_rate_mismatch_rejected() {
        let mut sink = MemorySink::new(15);
        let buffer = SampleBuffer::new(vec![0.0; 4096], 48000);
        let err = run_direct(
            &buffer,
            &SpectraConfig::default(),
            &mut sink,
            &ShutdownSignal::new(),
            || true,
        )
        .unwrap_err();
        assert!(matches!(err, ControlError::Core(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_loopback_renders_relayed_readings() {
        let mut config = SpectraConfig::default();
        config.mapping.policy = MappingPolicy::Threshold;
        let mut sink = MemorySink::new(15);
        let handle = sink.handle();

        let stats = run_loopback(&tone(3), &config, &mut sink, &ShutdownSignal::new(), || true)
            .unwrap();

        assert_eq!(stats.frames_analyzed, 3);
        assert_eq!(stats.published, 9);
        assert!(stats.frames_rendered >= 1);
        // Summed 100 Hz magnitude is far above the bass window
        let last = handle.last_flushed().unwrap();
        assert_eq!(last[2], 4095);
    }
}
