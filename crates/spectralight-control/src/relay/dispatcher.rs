//! Routes relayed readings into the band cache

use crate::relay::cache::BandCache;
use crate::transport::MessageHandler;
use spectralight_core::{parse_reading, Band, IntensityMapper, RelayConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Message handler for the consumer side of the relay
///
/// Runs on the transport's I/O thread. Each message is parsed, mapped to the
/// band's brightness, and stored in the cache; rendering happens elsewhere.
pub struct BandDispatcher {
    topics: [String; 3],
    mapper: IntensityMapper,
    cache: Arc<BandCache>,
    received: AtomicU64,
    ignored: AtomicU64,
}

impl BandDispatcher {
    pub fn new(relay: &RelayConfig, mapper: IntensityMapper, cache: Arc<BandCache>) -> Self {
        Self {
            topics: Band::ALL.map(|band| relay.topic(band).to_string()),
            mapper,
            cache,
            received: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
        }
    }

    /// Topics to subscribe to, bass first
    pub fn topics(&self) -> Vec<String> {
        self.topics.to_vec()
    }

    /// Band carried by a topic
    pub fn band_for(&self, topic: &str) -> Option<Band> {
        Band::ALL
            .into_iter()
            .find(|band| self.topics[band.index()] == topic)
    }

    /// Messages applied to the cache
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Messages for topics this dispatcher does not own
    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }
}

impl MessageHandler for BandDispatcher {
    fn on_connect(&self) {
        info!("Relay subscribed to {}", self.topics.join(", "));
    }

    fn on_message(&self, topic: &str, payload: &[u8]) {
        let Some(band) = self.band_for(topic) else {
            self.ignored.fetch_add(1, Ordering::Relaxed);
            debug!("No band for topic '{}'", topic);
            return;
        };

        let reading = parse_reading(payload);
        let brightness = self.mapper.map_reading(band, reading);
        trace!("{} <- {} ({} LEDs lit)", band, reading, brightness.iter().filter(|v| **v > 0).count());

        self.cache.update(band, reading, &brightness);
        self.received.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectralight_core::{MappingConfig, MappingPolicy};

    fn dispatcher(policy: MappingPolicy) -> (BandDispatcher, Arc<BandCache>) {
        let cache = Arc::new(BandCache::new(5));
        let mapping = MappingConfig {
            policy,
            ..Default::default()
        };
        let dispatcher = BandDispatcher::new(
            &RelayConfig::default(),
            IntensityMapper::new(mapping, 5),
            Arc::clone(&cache),
        );
        (dispatcher, cache)
    }

    #[test]
    fn test_topic_routing() {
        let (dispatcher, _) = dispatcher(MappingPolicy::Threshold);
        assert_eq!(dispatcher.band_for("spectralight/mid"), Some(Band::Mid));
        assert_eq!(dispatcher.band_for("spectralight/other"), None);
        assert_eq!(dispatcher.topics().len(), 3);
    }

    #[test]
    fn test_unknown_topic_ignored() {
        let (dispatcher, cache) = dispatcher(MappingPolicy::Threshold);
        dispatcher.on_message("elsewhere", b"100");
        assert_eq!(dispatcher.ignored(), 1);
        assert!(!cache.is_dirty());
    }

    #[test]
    fn test_reading_above_window_is_full() {
        let (dispatcher, cache) = dispatcher(MappingPolicy::Threshold);
        dispatcher.on_message("spectralight/bass", b"1000");

        let snapshot = cache.take_if_dirty().unwrap();
        assert_eq!(snapshot.reading(Band::Bass), 1000.0);
        // Bell pattern peaks at the center LED
        assert_eq!(snapshot.frame.group(Band::Bass)[2], 4095);
        assert_eq!(dispatcher.received(), 1);
    }

    #[test]
    fn test_garbage_payload_reads_zero() {
        let (dispatcher, cache) = dispatcher(MappingPolicy::Energy);
        dispatcher.on_message("spectralight/treble", b"abc");

        let snapshot = cache.take_if_dirty().unwrap();
        assert_eq!(snapshot.reading(Band::Treble), 0.0);
        assert!(snapshot.frame.group(Band::Treble).iter().all(|v| *v == 0));
    }
}
