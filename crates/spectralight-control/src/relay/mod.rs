//! Relayed delivery: readings published per band, rendered by a consumer

pub mod cache;
pub mod consumer;
pub mod dispatcher;
pub mod publisher;

pub use cache::{BandCache, BandSnapshot};
pub use consumer::{ConsumerState, ConsumerStats, RelayConsumer};
pub use dispatcher::BandDispatcher;
pub use publisher::RelayPublisher;
