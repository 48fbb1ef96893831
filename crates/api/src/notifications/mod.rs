//! Station change relay.
//!
//! The [`StationFeed`] subscribes to the event bus and forwards every
//! station event to the WebSocket subscribers.

pub mod feed;

pub use feed::StationFeed;
