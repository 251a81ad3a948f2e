//! Publish/subscribe transports for relayed delivery
//!
//! A producer publishes one UTF-8 decimal reading per band to a named topic;
//! a consumer subscribes to the topics and receives messages on a dedicated
//! `transport-io` thread through a registered [`MessageHandler`].

pub mod loopback;
#[cfg(feature = "osc")]
pub mod osc;

pub use loopback::LoopbackTransport;
#[cfg(feature = "osc")]
pub use osc::OscTransport;

use crate::error::ControlError;
use crate::Result;
use spectralight_core::{RelayConfig, TransportKind};
use std::sync::Arc;

/// Receives transport events on the I/O thread
pub trait MessageHandler: Send + Sync {
    /// The subscription is live
    fn on_connect(&self) {}

    /// A message arrived on a subscribed topic
    fn on_message(&self, topic: &str, payload: &[u8]);
}

/// Connect/publish/subscribe primitives
pub trait Transport: Send {
    /// Fire-and-forget publish
    fn publish(&self, topic: &str, payload: &str) -> Result<()>;

    /// Start delivering messages for `topics` to `handler`
    fn subscribe(&mut self, topics: &[String], handler: Arc<dyn MessageHandler>) -> Result<()>;

    /// Stop delivery and release the connection; idempotent
    fn disconnect(&mut self) -> Result<()>;

    /// True between connect and disconnect
    fn is_connected(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        (**self).publish(topic, payload)
    }

    fn subscribe(&mut self, topics: &[String], handler: Arc<dyn MessageHandler>) -> Result<()> {
        (**self).subscribe(topics, handler)
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Which side of the relay a transport serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Publisher,
    Subscriber,
}

/// Open a network transport from configuration
///
/// Loopback transports only exist within one process; use
/// [`LoopbackTransport::pair`] for those.
pub fn connect(config: &RelayConfig, role: Role) -> Result<Box<dyn Transport>> {
    match config.transport {
        #[cfg(feature = "osc")]
        TransportKind::Osc => {
            let transport = match role {
                Role::Publisher => OscTransport::publisher(&config.peer_address)?,
                Role::Subscriber => OscTransport::subscriber(&config.bind_address)?,
            };
            Ok(Box::new(transport))
        }
        #[cfg(not(feature = "osc"))]
        TransportKind::Osc => Err(ControlError::TransportConnect(
            "built without OSC support".to_string(),
        )),
        TransportKind::Loopback => Err(ControlError::TransportConnect(
            "loopback transport is only available within one process".to_string(),
        )),
    }
}
