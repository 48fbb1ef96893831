//! Radar station API server library.
//!
//! Exposes the core building blocks (config, state, error handling, routes,
//! the advance coordinator, WebSocket infrastructure) so integration tests
//! and the binary entrypoint can both access them.

pub mod background;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notifications;
pub mod response;
pub mod routes;
pub mod state;
pub mod ws;
