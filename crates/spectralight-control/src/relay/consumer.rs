//! Consumer side of the relay: subscribe, cache, render on a fixed tick

use crate::relay::cache::BandCache;
use crate::relay::dispatcher::BandDispatcher;
use crate::session::ShutdownSignal;
use crate::sink::ActuationSink;
use crate::transport::Transport;
use crate::Result;
use spectralight_core::{IntensityMapper, RelayConfig};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Where the consumer is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Subscribed, nothing received yet
    WaitingForData,
    /// At least one update rendered
    Rendering,
    /// Shutdown requested; outputs zeroed by the caller's guard
    Stopped,
}

/// Consumer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub ticks: u64,
    pub renders: u64,
    /// Updates received but superseded before they were rendered
    pub superseded: u64,
}

/// Renders the latest cached band state at most once per tick
pub struct RelayConsumer {
    cache: Arc<BandCache>,
    dispatcher: Arc<BandDispatcher>,
    poll_interval: Duration,
    state: ConsumerState,
    rendered_sequence: u64,
    stats: ConsumerStats,
}

impl RelayConsumer {
    pub fn new(relay: &RelayConfig, mapper: IntensityMapper) -> Self {
        let cache = Arc::new(BandCache::new(mapper.leds_per_group()));
        let dispatcher = Arc::new(BandDispatcher::new(relay, mapper, Arc::clone(&cache)));
        Self {
            cache,
            dispatcher,
            poll_interval: Duration::from_millis(relay.poll_interval_ms.max(1)),
            state: ConsumerState::WaitingForData,
            rendered_sequence: 0,
            stats: ConsumerStats::default(),
        }
    }

    /// Register the dispatcher for the band topics
    pub fn attach<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<()> {
        let topics = self.dispatcher.topics();
        transport.subscribe(&topics, Arc::clone(&self.dispatcher) as _)?;
        debug!("Relay consumer attached to {} topics", topics.len());
        Ok(())
    }

    pub fn cache(&self) -> &Arc<BandCache> {
        &self.cache
    }

    pub fn dispatcher(&self) -> &Arc<BandDispatcher> {
        &self.dispatcher
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// Render if the cache changed since the last render
    ///
    /// Returns true when a frame was written to the sink.
    pub fn poll_once<S: ActuationSink + ?Sized>(&mut self, sink: &mut S) -> Result<bool> {
        self.stats.ticks += 1;
        let Some(snapshot) = self.cache.take_if_dirty() else {
            return Ok(false);
        };

        sink.apply(&snapshot.frame)?;

        let skipped = snapshot
            .sequence
            .saturating_sub(self.rendered_sequence)
            .saturating_sub(1);
        self.stats.superseded += skipped;
        self.rendered_sequence = snapshot.sequence;
        self.stats.renders += 1;

        if self.state == ConsumerState::WaitingForData {
            info!("First relayed update rendered");
            self.state = ConsumerState::Rendering;
        }
        Ok(true)
    }

    /// Tick until `shutdown` is triggered
    pub fn run<S: ActuationSink + ?Sized>(
        &mut self,
        sink: &mut S,
        shutdown: &ShutdownSignal,
    ) -> Result<ConsumerStats> {
        info!(
            "Relay consumer running ({}ms tick)",
            self.poll_interval.as_millis()
        );

        while !shutdown.is_triggered() {
            let tick_start = Instant::now();
            self.poll_once(sink)?;

            let elapsed = tick_start.elapsed();
            if elapsed < self.poll_interval {
                thread::sleep(self.poll_interval - elapsed);
            }
        }

        self.state = ConsumerState::Stopped;
        info!(
            "Relay consumer stopped: {} renders, {} superseded updates",
            self.stats.renders, self.stats.superseded
        );
        Ok(self.stats)
    }
}
