//! Actuation frame: quantized brightness for every LED channel

use crate::bands::Band;
use crate::intensity::FULL_SCALE;

/// Brightness for three groups of N LEDs
///
/// Channel `band.group_offset(n) + position` holds the value for `position`
/// in that band's group. Every value is within `0..=FULL_SCALE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationFrame {
    leds_per_group: usize,
    values: Vec<u16>,
}

impl ActuationFrame {
    /// All channels dark
    pub fn dark(leds_per_group: usize) -> Self {
        Self {
            leds_per_group,
            values: vec![0; leds_per_group * Band::ALL.len()],
        }
    }

    /// LEDs per group
    pub fn leds_per_group(&self) -> usize {
        self.leds_per_group
    }

    /// Total channel count
    pub fn channel_count(&self) -> usize {
        self.values.len()
    }

    /// Replace one group's brightness
    ///
    /// Missing positions are set dark, extra values are ignored and values
    /// above full scale are clamped.
    pub fn set_group(&mut self, band: Band, brightness: &[u16]) {
        let offset = band.group_offset(self.leds_per_group);
        let group = &mut self.values[offset..offset + self.leds_per_group];
        for (i, slot) in group.iter_mut().enumerate() {
            *slot = brightness.get(i).copied().unwrap_or(0).min(FULL_SCALE);
        }
    }

    /// One group's brightness
    pub fn group(&self, band: Band) -> &[u16] {
        let offset = band.group_offset(self.leds_per_group);
        &self.values[offset..offset + self.leds_per_group]
    }

    /// Number of lit LEDs in a group
    pub fn lit_count(&self, band: Band) -> usize {
        self.group(band).iter().filter(|v| **v > 0).count()
    }

    /// Brightness of a single channel
    pub fn get(&self, channel: usize) -> Option<u16> {
        self.values.get(channel).copied()
    }

    /// All channel values in channel order
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// `(channel, brightness)` pairs in channel order
    pub fn channels(&self) -> impl Iterator<Item = (usize, u16)> + '_ {
        self.values.iter().copied().enumerate()
    }

    /// True when every channel is 0
    pub fn is_dark(&self) -> bool {
        self.values.iter().all(|v| *v == 0)
    }
}
