//! Producer side of the relay

use crate::transport::Transport;
use spectralight_core::{Band, BandReadings, RelayConfig};
use tracing::warn;

/// Publishes one reading per band per frame
pub struct RelayPublisher {
    topics: [String; 3],
    published: u64,
    failed: u64,
}

impl RelayPublisher {
    pub fn new(relay: &RelayConfig) -> Self {
        Self {
            topics: Band::ALL.map(|band| relay.topic(band).to_string()),
            published: 0,
            failed: 0,
        }
    }

    /// Send the three readings; failures are logged and skipped
    ///
    /// Returns the number of messages accepted by the transport.
    pub fn publish<T: Transport + ?Sized>(&mut self, transport: &T, readings: &BandReadings) -> usize {
        let mut sent = 0;
        for band in Band::ALL {
            let topic = &self.topics[band.index()];
            match transport.publish(topic, &readings.payload(band)) {
                Ok(()) => sent += 1,
                Err(e) => {
                    self.failed += 1;
                    warn!("Publish to '{}' failed: {}", topic, e);
                }
            }
        }
        self.published += sent as u64;
        sent
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}
