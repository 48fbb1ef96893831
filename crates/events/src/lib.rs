//! Radar station event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`StationEvent`]: the change-feed message, published on the bus and
//!   forwarded verbatim to WebSocket listeners.

pub mod bus;

pub use bus::{CatalogChange, EventBus, StationEvent};
