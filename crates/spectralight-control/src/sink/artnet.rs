//! Art-Net output (Art-Net 4 OpDmx)
//!
//! Art-Net is a UDP-based protocol for transmitting DMX512 over Ethernet. Each
//! LED channel maps to one DMX slot starting at `start_address`; 12-bit
//! brightness is scaled down to the 8-bit DMX range.

use std::net::{SocketAddr, UdpSocket};

use crate::error::ControlError;
use crate::sink::ActuationSink;
use crate::Result;
use spectralight_core::FULL_SCALE;

const DMX_SLOTS: usize = 512;
const HEADER_LEN: usize = 18;

/// Art-Net sink for one universe
pub struct ArtNetSink {
    socket: UdpSocket,
    target: SocketAddr,
    universe: u16,
    sequence: u8,
    /// Zero-based DMX slot of channel 0
    base_slot: usize,
    channel_count: usize,
    dmx: [u8; DMX_SLOTS],
}

impl ArtNetSink {
    /// Create a new Art-Net sink
    ///
    /// # Arguments
    /// * `universe` - Art-Net universe (0-32767)
    /// * `target` - Destination, typically broadcast "255.255.255.255:6454"
    /// * `start_address` - DMX address (1-512) of channel 0
    /// * `channel_count` - LED channels to map
    pub fn new(
        universe: u16,
        target: &str,
        start_address: u16,
        channel_count: usize,
    ) -> Result<Self> {
        let target: SocketAddr = target.parse().map_err(|e| {
            ControlError::Actuation(format!("Invalid Art-Net target address: {}", e))
        })?;

        if start_address == 0 || start_address as usize + channel_count > DMX_SLOTS + 1 {
            return Err(ControlError::Actuation(format!(
                "{} channels from DMX address {} do not fit in a universe",
                channel_count, start_address
            )));
        }

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;

        tracing::info!(
            "Art-Net sink created for universe {} -> {} ({} channels at address {})",
            universe,
            target,
            channel_count,
            start_address
        );

        Ok(Self {
            socket,
            target,
            universe,
            sequence: 0,
            base_slot: start_address as usize - 1,
            channel_count,
            dmx: [0; DMX_SLOTS],
        })
    }

    /// Current universe
    pub fn universe(&self) -> u16 {
        self.universe
    }

    /// Current DMX slot values
    pub fn dmx(&self) -> &[u8; DMX_SLOTS] {
        &self.dmx
    }

    /// Build an Art-Net DMX packet (OpDmx)
    fn build_packet(&self) -> Vec<u8> {
        let mut packet = vec![0u8; HEADER_LEN + DMX_SLOTS];

        packet[0..8].copy_from_slice(b"Art-Net\0");
        // OpDmx, little-endian
        packet[8..10].copy_from_slice(&0x5000u16.to_le_bytes());
        // Protocol version 14, big-endian
        packet[10..12].copy_from_slice(&14u16.to_be_bytes());
        packet[12] = self.sequence;
        packet[13] = 0;
        packet[14..16].copy_from_slice(&self.universe.to_le_bytes());
        packet[16..18].copy_from_slice(&(DMX_SLOTS as u16).to_be_bytes());
        packet[HEADER_LEN..].copy_from_slice(&self.dmx);

        packet
    }
}

/// Scale 12-bit brightness to an 8-bit DMX level
pub fn to_dmx_level(brightness: u16) -> u8 {
    ((brightness.min(FULL_SCALE) as u32 * 255 + FULL_SCALE as u32 / 2) / FULL_SCALE as u32) as u8
}

impl ActuationSink for ArtNetSink {
    fn set(&mut self, channel: usize, brightness: u16) -> Result<()> {
        if channel >= self.channel_count {
            return Err(ControlError::ChannelOutOfRange {
                channel,
                count: self.channel_count,
            });
        }
        self.dmx[self.base_slot + channel] = to_dmx_level(brightness);
        Ok(())
    }

    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn flush(&mut self) -> Result<()> {
        let packet = self.build_packet();
        self.socket
            .send_to(&packet, self.target)
            .map_err(|e| ControlError::Actuation(format!("Art-Net send failed: {}", e)))?;
        self.sequence = self.sequence.wrapping_add(1);

        tracing::trace!("Sent Art-Net DMX packet for universe {}", self.universe);
        Ok(())
    }
}
