//! Domain logic for the Radar station.
//!
//! This crate has zero internal deps so it can be shared by the API server,
//! the repository layer, and the listener daemon.

pub mod admin_token;
pub mod error;
pub mod retry;
pub mod rotation;
pub mod station;
pub mod sync;
pub mod track;
pub mod types;
