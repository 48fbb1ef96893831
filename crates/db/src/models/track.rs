//! Track entity model and DTOs.

use radar_core::rotation::RotationEntry;
use radar_core::station::TrackInfo;
use radar_core::track::{is_in_rotation, MAX_DURATION_SECONDS};
use radar_core::types::{DbId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `tracks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Track {
    pub id: DbId,
    pub artist_name: String,
    pub track_title: String,
    pub audio_source_url: String,
    pub cover_image_url: Option<String>,
    pub source_type: String,
    /// Authoritative for scheduling; the player's own reported duration is
    /// never used.
    pub duration_seconds: i32,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Track {
    pub fn is_active(&self) -> bool {
        is_in_rotation(&self.status)
    }

    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            id: self.id,
            artist_name: self.artist_name.clone(),
            track_title: self.track_title.clone(),
            audio_source_url: self.audio_source_url.clone(),
            cover_image_url: self.cover_image_url.clone(),
            duration_seconds: self.duration_seconds,
        }
    }

    pub fn rotation_entry(&self) -> RotationEntry {
        RotationEntry {
            id: self.id,
            duration_seconds: self.duration_seconds,
        }
    }
}

/// DTO for appending a track to the catalog.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTrack {
    #[validate(length(min = 1, max = 200))]
    pub artist_name: String,
    #[validate(length(min = 1, max = 200))]
    pub track_title: String,
    #[validate(url)]
    pub audio_source_url: String,
    #[validate(url)]
    pub cover_image_url: Option<String>,
    #[validate(custom(function = "radar_core::track::validate_source_type"))]
    pub source_type: Option<String>,
    #[validate(range(min = 1, max = MAX_DURATION_SECONDS))]
    pub duration_seconds: i32,
    #[validate(custom(function = "radar_core::track::validate_status"))]
    pub status: Option<String>,
}

/// DTO for editing a track. All fields optional; `status` toggles rotation
/// membership.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTrack {
    #[validate(length(min = 1, max = 200))]
    pub artist_name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub track_title: Option<String>,
    #[validate(url)]
    pub audio_source_url: Option<String>,
    /// Absent keeps the current image; an explicit `null` clears it.
    #[serde(default, deserialize_with = "present")]
    #[validate(url)]
    pub cover_image_url: Option<Option<String>>,
    #[validate(custom(function = "radar_core::track::validate_source_type"))]
    pub source_type: Option<String>,
    #[validate(range(min = 1, max = MAX_DURATION_SECONDS))]
    pub duration_seconds: Option<i32>,
    #[validate(custom(function = "radar_core::track::validate_status"))]
    pub status: Option<String>,
}

/// Wrap a field that was present in the body, `null` included, in `Some`.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
