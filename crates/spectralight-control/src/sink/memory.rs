//! In-memory sink for dry runs and tests

use crate::error::ControlError;
use crate::sink::ActuationSink;
use crate::Result;
use parking_lot::Mutex;
use spectralight_core::FULL_SCALE;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemoryState {
    staged: Vec<u16>,
    flushed: Vec<Vec<u16>>,
}

/// Records channel state and every flushed frame
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
    channel_count: usize,
}

/// Read access to a `MemorySink` that has been moved elsewhere
#[derive(Clone)]
pub struct MemorySinkHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new(channel_count: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                staged: vec![0; channel_count],
                flushed: Vec::new(),
            })),
            channel_count,
        }
    }

    pub fn handle(&self) -> MemorySinkHandle {
        MemorySinkHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl MemorySinkHandle {
    /// Current (staged) channel values
    pub fn channels(&self) -> Vec<u16> {
        self.state.lock().staged.clone()
    }

    /// Number of flushes so far
    pub fn flush_count(&self) -> usize {
        self.state.lock().flushed.len()
    }

    /// Every flushed frame, oldest first
    pub fn history(&self) -> Vec<Vec<u16>> {
        self.state.lock().flushed.clone()
    }

    /// Most recently flushed frame
    pub fn last_flushed(&self) -> Option<Vec<u16>> {
        self.state.lock().flushed.last().cloned()
    }
}

impl ActuationSink for MemorySink {
    fn set(&mut self, channel: usize, brightness: u16) -> Result<()> {
        let mut state = self.state.lock();
        let count = state.staged.len();
        let slot = state
            .staged
            .get_mut(channel)
            .ok_or(ControlError::ChannelOutOfRange { channel, count })?;
        *slot = brightness.min(FULL_SCALE);
        Ok(())
    }

    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn flush(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        let snapshot = state.staged.clone();
        state.flushed.push(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_flushes() {
        let mut sink = MemorySink::new(3);
        let handle = sink.handle();

        sink.set(1, 5000).unwrap();
        assert_eq!(handle.channels(), vec![0, 4095, 0]);
        assert_eq!(handle.flush_count(), 0);

        sink.flush().unwrap();
        sink.set(1, 7).unwrap();
        sink.flush().unwrap();
        assert_eq!(handle.history(), vec![vec![0, 4095, 0], vec![0, 7, 0]]);
        assert_eq!(handle.last_flushed(), Some(vec![0, 7, 0]));
    }

    #[test]
    fn test_out_of_range() {
        let mut sink = MemorySink::new(3);
        assert!(sink.set(3, 1).is_err());
    }
}
