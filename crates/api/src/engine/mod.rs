//! The station engine: the only code that writes the station state.
//!
//! - [`coordinator`] -- conditional advance and admin tune.
//! - [`now_playing`] -- the joined read model served to listeners.

pub mod coordinator;
pub mod now_playing;

pub use coordinator::{advance, tune, AdvanceOutcome};
pub use now_playing::now_playing;
