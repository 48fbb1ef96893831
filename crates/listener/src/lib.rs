//! `radar-listener` library crate.
//!
//! A headless station listener: it fetches the shared timeline, keeps its
//! playback surface in step with it, and asks the server to advance when the
//! current track ends. The binary entrypoint lives in `main.rs`.

pub mod client;
pub mod config;
pub mod feed;
pub mod listener;
pub mod playback;
