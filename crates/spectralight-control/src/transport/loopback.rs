//! In-process transport over a crossbeam channel

use crate::error::ControlError;
use crate::transport::{MessageHandler, Transport};
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

type Message = (String, Vec<u8>);

/// One end of an in-process relay
pub struct LoopbackTransport {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    connected: Arc<AtomicBool>,
    io_thread: Option<JoinHandle<()>>,
}

impl LoopbackTransport {
    /// Connected publisher and subscriber ends
    pub fn pair() -> (Self, Self) {
        let (tx, rx) = unbounded();
        let make = || Self {
            tx: tx.clone(),
            rx: rx.clone(),
            connected: Arc::new(AtomicBool::new(true)),
            io_thread: None,
        };
        (make(), make())
    }
}

impl Transport for LoopbackTransport {
    fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(ControlError::Transport("loopback disconnected".to_string()));
        }
        // Nobody listening is not an error for fire-and-forget delivery
        if self
            .tx
            .send((topic.to_string(), payload.as_bytes().to_vec()))
            .is_err()
        {
            debug!("Loopback publish to '{}' dropped: no receiver", topic);
        }
        Ok(())
    }

    fn subscribe(&mut self, topics: &[String], handler: Arc<dyn MessageHandler>) -> Result<()> {
        if self.io_thread.is_some() {
            return Err(ControlError::Transport("already subscribed".to_string()));
        }

        let rx = self.rx.clone();
        let connected = Arc::clone(&self.connected);
        let topics: Vec<String> = topics.to_vec();

        let handle = thread::Builder::new()
            .name("transport-io".to_string())
            .spawn(move || {
                info!("Loopback subscriber started ({} topics)", topics.len());
                handler.on_connect();

                while connected.load(Ordering::Acquire) {
                    match rx.recv_timeout(Duration::from_millis(50)) {
                        Ok((topic, payload)) => {
                            if topics.iter().any(|t| *t == topic) {
                                handler.on_message(&topic, &payload);
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("Loopback subscriber stopped");
            })?;

        self.io_thread = Some(handle);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        if let Some(handle) = self.io_thread.take() {
            handle
                .join()
                .map_err(|_| ControlError::Transport("transport-io thread panicked".to_string()))?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Collect(Mutex<Vec<(String, String)>>, AtomicBool);

    impl MessageHandler for Collect {
        fn on_connect(&self) {
            self.1.store(true, Ordering::SeqCst);
        }

        fn on_message(&self, topic: &str, payload: &[u8]) {
            self.0
                .lock()
                .push((topic.to_string(), String::from_utf8_lossy(payload).into_owned()));
        }
    }

    #[test]
    fn test_publish_reaches_subscriber() {
        let (publisher, mut subscriber) = LoopbackTransport::pair();
        let handler = Arc::new(Collect(Mutex::new(Vec::new()), AtomicBool::new(false)));

        subscriber
            .subscribe(&["a/bass".to_string()], handler.clone())
            .unwrap();
        publisher.publish("a/bass", "42").unwrap();
        publisher.publish("a/other", "1").unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while handler.0.lock().is_empty() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        subscriber.disconnect().unwrap();

        assert!(handler.1.load(Ordering::SeqCst));
        assert_eq!(
            *handler.0.lock(),
            vec![("a/bass".to_string(), "42".to_string())]
        );
        assert!(!subscriber.is_connected());
    }

    #[test]
    fn test_publish_after_disconnect_fails() {
        let (mut publisher, _subscriber) = LoopbackTransport::pair();
        publisher.disconnect().unwrap();
        assert!(publisher.publish("t", "1").is_err());
    }
}
