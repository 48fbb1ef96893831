//! WebSocket change feed.
//!
//! Listeners subscribe here to hear about station changes as they are
//! committed instead of waiting for their next periodic re-fetch.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
