//! Shared response envelope types for API handlers.
//!
//! Resource responses use a `{ "data": ... }` envelope. The advance endpoint
//! is the exception: it answers with a bare `AdvanceReply` that listeners
//! parse directly.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
