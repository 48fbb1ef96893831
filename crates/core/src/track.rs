//! Track catalog rules shared by the API and repository layers.
//!
//! Status and source type values must match the CHECK constraints in
//! `20260301000001_create_tracks.sql`.

use validator::ValidationError;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// The track takes part in the rotation.
pub const STATUS_ACTIVE: &str = "active";

/// The track is kept in the catalog but skipped by the rotation.
pub const STATUS_INACTIVE: &str = "inactive";

pub const VALID_STATUSES: &[&str] = &[STATUS_ACTIVE, STATUS_INACTIVE];

// ---------------------------------------------------------------------------
// Source type
// ---------------------------------------------------------------------------

pub const SOURCE_SOUNDCLOUD: &str = "soundcloud";
pub const SOURCE_YOUTUBE: &str = "youtube";
pub const SOURCE_FILE: &str = "file";

pub const VALID_SOURCE_TYPES: &[&str] = &[SOURCE_SOUNDCLOUD, SOURCE_YOUTUBE, SOURCE_FILE];

/// Upper bound for `duration_seconds` (12 hours).
pub const MAX_DURATION_SECONDS: i32 = 12 * 60 * 60;

// ---------------------------------------------------------------------------
// Validators (used via `#[validate(custom(function = ...))]`)
// ---------------------------------------------------------------------------

pub fn validate_status(status: &str) -> Result<(), ValidationError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_status");
        err.message = Some(format!("status must be one of {VALID_STATUSES:?}").into());
        Err(err)
    }
}

pub fn validate_source_type(source_type: &str) -> Result<(), ValidationError> {
    if VALID_SOURCE_TYPES.contains(&source_type) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_source_type");
        err.message = Some(format!("source_type must be one of {VALID_SOURCE_TYPES:?}").into());
        Err(err)
    }
}

pub fn is_in_rotation(status: &str) -> bool {
    status == STATUS_ACTIVE
}
