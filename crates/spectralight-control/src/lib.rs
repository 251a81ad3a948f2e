//! SpectraLight Control - LED actuation and relayed delivery
//!
//! This crate moves mapped intensities to lights:
//! - Actuation sinks (Art-Net DMX, in-memory, log bar graph)
//! - Publish/subscribe transports (OSC over UDP, in-process loopback)
//! - Relay producer and consumer with a latest-value band cache
//! - Session loops with shutdown signalling and zero-on-exit guards

pub mod error;
pub mod relay;
pub mod session;
pub mod sink;
pub mod transport;

pub use error::{ControlError, Result};
pub use relay::{
    BandCache, BandDispatcher, BandSnapshot, ConsumerState, ConsumerStats, RelayConsumer,
    RelayPublisher,
};
pub use session::{
    run_direct, run_loopback, run_publisher, ActuationGuard, SessionStats, ShutdownSignal,
    TransportGuard,
};
pub use sink::{create_sink, ActuationSink, ArtNetSink, LogSink, MemorySink, MemorySinkHandle};
#[cfg(feature = "osc")]
pub use transport::OscTransport;
pub use transport::{connect, LoopbackTransport, MessageHandler, Role, Transport};
