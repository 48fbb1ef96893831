//! Request extractors guarding the admin endpoints.
//!
//! - [`admin::RequireAdmin`] -- Requires the configured admin bearer token.

pub mod admin;

pub use admin::RequireAdmin;
