//! Sink that renders the LED groups as a bar line in the log

use crate::error::ControlError;
use crate::sink::ActuationSink;
use crate::Result;
use spectralight_core::{Band, FULL_SCALE};

/// Glyphs from dark to full brightness
const LEVELS: [char; 5] = [' ', '.', ':', '*', '#'];

pub struct LogSink {
    channels: Vec<u16>,
    leds_per_group: usize,
    frames: u64,
}

impl LogSink {
    /// Sink for `channel_count` channels in three equal groups
    pub fn new(channel_count: usize) -> Self {
        Self {
            channels: vec![0; channel_count],
            leds_per_group: channel_count / Band::ALL.len(),
            frames: 0,
        }
    }

    /// Bar line for the staged values, e.g. `bass [##:  ] mid [.    ] treble [     ]`
    pub fn render_line(&self) -> String {
        let n = self.leds_per_group;
        Band::ALL
            .iter()
            .map(|band| {
                let offset = band.group_offset(n);
                let bar: String = self.channels[offset..offset + n]
                    .iter()
                    .map(|v| glyph(*v))
                    .collect();
                format!("{} [{}]", band, bar)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn glyph(brightness: u16) -> char {
    if brightness == 0 {
        return LEVELS[0];
    }
    let steps = LEVELS.len() - 1;
    let index = 1 + (brightness.min(FULL_SCALE) as usize * (steps - 1)) / FULL_SCALE as usize;
    LEVELS[index.min(steps)]
}

impl ActuationSink for LogSink {
    fn set(&mut self, channel: usize, brightness: u16) -> Result<()> {
        let count = self.channels.len();
        let slot = self
            .channels
            .get_mut(channel)
            .ok_or(ControlError::ChannelOutOfRange { channel, count })?;
        *slot = brightness.min(FULL_SCALE);
        Ok(())
    }

    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn flush(&mut self) -> Result<()> {
        self.frames += 1;
        tracing::info!(target: "spectralight::leds", "#{:<6} {}", self.frames, self.render_line());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_line() {
        let mut sink = LogSink::new(6);
        sink.set(0, 4095).unwrap();
        sink.set(1, 819).unwrap();
        sink.set(4, 2047).unwrap();
        assert_eq!(sink.render_line(), "bass [#.] mid [  ] treble [: ]");
    }

    #[test]
    fn test_glyph_extremes() {
        assert_eq!(glyph(0), ' ');
        assert_eq!(glyph(1), '.');
        assert_eq!(glyph(4095), '#');
    }
}
