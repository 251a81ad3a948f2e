//! Actuation sinks
//!
//! A sink exposes "set channel brightness" semantics for the 3N LED channels.
//! Channel `band_group_offset + position` addresses one LED (bass `0..N`,
//! mid `N..2N`, treble `2N..3N`). Values are 12-bit (`0..=4095`).

pub mod artnet;
pub mod log;
pub mod memory;

pub use artnet::ArtNetSink;
pub use log::LogSink;
pub use memory::{MemorySink, MemorySinkHandle};

use crate::Result;
use spectralight_core::{ActuationFrame, OutputConfig, SinkKind};

/// LED output
pub trait ActuationSink: Send {
    /// Stage a channel's brightness (0-4095)
    fn set(&mut self, channel: usize, brightness: u16) -> Result<()>;

    /// Number of addressable channels
    fn channel_count(&self) -> usize;

    /// Push staged values to the device
    fn flush(&mut self) -> Result<()>;

    /// Stage every channel of a frame and flush once
    fn apply(&mut self, frame: &ActuationFrame) -> Result<()> {
        for (channel, brightness) in frame.channels() {
            self.set(channel, brightness)?;
        }
        self.flush()
    }

    /// Turn every channel off
    fn zero_all(&mut self) -> Result<()> {
        for channel in 0..self.channel_count() {
            self.set(channel, 0)?;
        }
        self.flush()
    }
}

impl<S: ActuationSink + ?Sized> ActuationSink for Box<S> {
    fn set(&mut self, channel: usize, brightness: u16) -> Result<()> {
        (**self).set(channel, brightness)
    }

    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn apply(&mut self, frame: &ActuationFrame) -> Result<()> {
        (**self).apply(frame)
    }

    fn zero_all(&mut self) -> Result<()> {
        (**self).zero_all()
    }
}

/// Build the configured sink for `channel_count` channels
pub fn create_sink(config: &OutputConfig, channel_count: usize) -> Result<Box<dyn ActuationSink>> {
    let sink: Box<dyn ActuationSink> = match config.sink {
        SinkKind::Log => Box::new(LogSink::new(channel_count)),
        SinkKind::Memory => Box::new(MemorySink::new(channel_count)),
        SinkKind::Artnet => Box::new(ArtNetSink::new(
            config.universe,
            &config.artnet_target,
            config.start_address,
            channel_count,
        )?),
    };
    Ok(sink)
}
