//! OSC over UDP
//!
//! Topic `spectralight/bass` travels as OSC address `/spectralight/bass` with
//! the reading as a single string argument. Numeric arguments from other OSC
//! senders are accepted and formatted as decimal text.

use crate::error::ControlError;
use crate::transport::{MessageHandler, Transport};
use crate::Result;
use rosc::{OscMessage, OscPacket, OscType};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read timeout so the I/O thread notices disconnects
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// OSC transport bound to a local UDP socket
#[derive(Debug)]
pub struct OscTransport {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    connected: Arc<AtomicBool>,
    io_thread: Option<JoinHandle<()>>,
}

impl OscTransport {
    /// Socket that sends to `peer`
    pub fn publisher(peer: &str) -> Result<Self> {
        let peer: SocketAddr = peer
            .parse()
            .map_err(|e| ControlError::TransportConnect(format!("invalid peer '{}': {}", peer, e)))?;
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| ControlError::TransportConnect(format!("bind failed: {}", e)))?;
        socket
            .set_broadcast(true)
            .map_err(|e| ControlError::TransportConnect(e.to_string()))?;

        info!("OSC publisher ready -> {}", peer);
        Ok(Self {
            socket,
            peer: Some(peer),
            connected: Arc::new(AtomicBool::new(true)),
            io_thread: None,
        })
    }

    /// Socket listening on `bind`
    pub fn subscriber(bind: &str) -> Result<Self> {
        let socket = UdpSocket::bind(bind)
            .map_err(|e| ControlError::TransportConnect(format!("bind {} failed: {}", bind, e)))?;
        socket
            .set_read_timeout(Some(RECV_TIMEOUT))
            .map_err(|e| ControlError::TransportConnect(e.to_string()))?;

        info!("OSC subscriber listening on {}", bind);
        Ok(Self {
            socket,
            peer: None,
            connected: Arc::new(AtomicBool::new(true)),
            io_thread: None,
        })
    }

    /// Local address of the socket
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

/// OSC address for a topic
pub fn topic_to_address(topic: &str) -> String {
    format!("/{}", topic.trim_start_matches('/'))
}

/// Topic for an OSC address
pub fn address_to_topic(address: &str) -> &str {
    address.trim_start_matches('/')
}

/// Payload bytes carried by the first argument
fn payload_from_args(args: &[OscType]) -> Vec<u8> {
    match args.first() {
        Some(OscType::String(s)) => s.clone().into_bytes(),
        Some(OscType::Float(f)) => f.to_string().into_bytes(),
        Some(OscType::Double(d)) => d.to_string().into_bytes(),
        Some(OscType::Int(i)) => i.to_string().into_bytes(),
        Some(OscType::Long(l)) => l.to_string().into_bytes(),
        // Anything else reaches the handler as an unparseable payload
        _ => Vec::new(),
    }
}

fn dispatch(packet: OscPacket, topics: &[String], handler: &dyn MessageHandler) {
    match packet {
        OscPacket::Message(msg) => {
            let topic = address_to_topic(&msg.addr);
            if topics.iter().any(|t| t == topic) {
                handler.on_message(topic, &payload_from_args(&msg.args));
            } else {
                debug!("Ignoring OSC message for {}", msg.addr);
            }
        }
        OscPacket::Bundle(bundle) => {
            for packet in bundle.content {
                dispatch(packet, topics, handler);
            }
        }
    }
}

impl Transport for OscTransport {
    fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(ControlError::Transport("OSC transport disconnected".to_string()));
        }
        let peer = self
            .peer
            .ok_or_else(|| ControlError::Transport("no peer address to publish to".to_string()))?;

        let packet = OscPacket::Message(OscMessage {
            addr: topic_to_address(topic),
            args: vec![OscType::String(payload.to_string())],
        });
        let bytes = rosc::encoder::encode(&packet).map_err(|e| ControlError::Osc(format!("{:?}", e)))?;
        self.socket
            .send_to(&bytes, peer)
            .map_err(|e| ControlError::Transport(format!("send to {} failed: {}", peer, e)))?;
        Ok(())
    }

    fn subscribe(&mut self, topics: &[String], handler: Arc<dyn MessageHandler>) -> Result<()> {
        if self.io_thread.is_some() {
            return Err(ControlError::Transport("already subscribed".to_string()));
        }

        let socket = self.socket.try_clone()?;
        let connected = Arc::clone(&self.connected);
        let topics: Vec<String> = topics.to_vec();

        let handle = thread::Builder::new()
            .name("transport-io".to_string())
            .spawn(move || {
                handler.on_connect();
                let mut buf = [0u8; rosc::decoder::MTU];

                while connected.load(Ordering::Acquire) {
                    let size = match socket.recv_from(&mut buf) {
                        Ok((size, _)) => size,
                        Err(e)
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut =>
                        {
                            continue;
                        }
                        Err(e) => {
                            warn!("OSC receive error: {}", e);
                            continue;
                        }
                    };

                    match rosc::decoder::decode_udp(&buf[..size]) {
                        Ok((_, packet)) => dispatch(packet, &topics, handler.as_ref()),
                        Err(e) => warn!("Dropping malformed OSC packet: {:?}", e),
                    }
                }
                debug!("OSC receive loop stopped");
            })?;

        self.io_thread = Some(handle);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.connected.swap(false, Ordering::AcqRel) {
            info!("OSC transport disconnected");
        }
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

impl Drop for OscTransport {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct Collect(Mutex<Vec<(String, Vec<u8>)>>);

    impl MessageHandler for Collect {
        fn on_message(&self, topic: &str, payload: &[u8]) {
            self.0.lock().push((topic.to_string(), payload.to_vec()));
        }
    }

    #[test]
    fn test_address_mapping() {
        assert_eq!(topic_to_address("spectralight/bass"), "/spectralight/bass");
        assert_eq!(topic_to_address("/already"), "/already");
        assert_eq!(address_to_topic("/spectralight/mid"), "spectralight/mid");
    }

    #[test]
    fn test_numeric_args_become_text() {
        assert_eq!(payload_from_args(&[OscType::Int(42)]), b"42".to_vec());
        assert_eq!(payload_from_args(&[OscType::Float(1.5)]), b"1.5".to_vec());
        assert!(payload_from_args(&[OscType::Bool(true)]).is_empty());
        assert!(payload_from_args(&[]).is_empty());
    }

    #[test]
    fn test_round_trip_over_udp() {
        let mut subscriber = OscTransport::subscriber("127.0.0.1:0").unwrap();
        let addr = subscriber.local_addr().unwrap();
        let handler = Arc::new(Collect::default());
        subscriber
            .subscribe(&["spectralight/bass".to_string()], handler.clone())
            .unwrap();

        let publisher = OscTransport::publisher(&addr.to_string()).unwrap();
        publisher.publish("spectralight/treble", "1").unwrap();
        publisher.publish("spectralight/bass", "2305").unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while handler.0.lock().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        subscriber.disconnect().unwrap();

        let received = handler.0.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "spectralight/bass");
        assert_eq!(received[0].1, b"2305".to_vec());
    }

    #[test]
    fn test_bad_bind_is_connect_error() {
        let err = OscTransport::subscriber("not-an-address").unwrap_err();
        assert!(matches!(err, ControlError::TransportConnect(_)));
    }
}
