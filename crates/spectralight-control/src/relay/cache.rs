//! Latest-value cache shared by the message handler and render loop

use arc_swap::ArcSwap;
use spectralight_core::{ActuationFrame, Band};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Most recent state of every band
#[derive(Debug, Clone, PartialEq)]
pub struct BandSnapshot {
    /// Last reading received per band (0.0 until the first message)
    pub readings: [f32; 3],
    /// Brightness computed from that reading
    pub frame: ActuationFrame,
    /// Total updates applied
    pub sequence: u64,
}

impl BandSnapshot {
    fn dark(leds_per_group: usize) -> Self {
        Self {
            readings: [0.0; 3],
            frame: ActuationFrame::dark(leds_per_group),
            sequence: 0,
        }
    }

    /// Reading for one band
    pub fn reading(&self, band: Band) -> f32 {
        self.readings[band.index()]
    }
}

/// At-most-one-current-value store with a dirty flag
///
/// Each update replaces the whole snapshot atomically. A burst of updates
/// between two renders collapses to the last one; nothing is queued.
pub struct BandCache {
    snapshot: ArcSwap<BandSnapshot>,
    dirty: AtomicBool,
    updates: AtomicU64,
}

impl BandCache {
    pub fn new(leds_per_group: usize) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(BandSnapshot::dark(leds_per_group)),
            dirty: AtomicBool::new(false),
            updates: AtomicU64::new(0),
        }
    }

    /// Replace one band's reading and brightness, then mark dirty
    pub fn update(&self, band: Band, reading: f32, brightness: &[u16]) {
        let sequence = self.updates.fetch_add(1, Ordering::AcqRel) + 1;
        self.snapshot.rcu(|current| {
            let mut next = BandSnapshot::clone(current);
            next.readings[band.index()] = reading;
            next.frame.set_group(band, brightness);
            next.sequence = sequence;
            next
        });
        self.dirty.store(true, Ordering::Release);
    }

    /// Current snapshot, regardless of the dirty flag
    pub fn load(&self) -> Arc<BandSnapshot> {
        self.snapshot.load_full()
    }

    /// Snapshot if anything changed since the last take; clears the flag
    pub fn take_if_dirty(&self) -> Option<Arc<BandSnapshot>> {
        if self.dirty.swap(false, Ordering::AcqRel) {
            Some(self.snapshot.load_full())
        } else {
            None
        }
    }

    /// True when an update has not been rendered yet
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Updates applied since creation
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }
}
