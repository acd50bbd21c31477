//! On-disk representation of a pending memory.
//!
//! The record is stored flat (type-specific fields are optional columns) so
//! that adding a capture mode does not change the shape of existing records.
//! `schema_version` follows semver: a reader accepts any record with the same
//! major version and ignores unknown fields.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use sunroof_core::error::{Result, SunroofError};
use sunroof_core::memory::{
    GeoLocation, MemoryContent, MemoryKind, MemoryStatus, NewPendingMemory, PendingMemory,
    WeatherSnapshot,
};

/// Version written into every new record.
pub const PENDING_MEMORY_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMemoryDTO {
    pub schema_version: String,
    pub id: String,
    pub journey_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub location: Option<GeoLocation>,
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: MemoryStatus,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl PendingMemoryDTO {
    /// Parses a stored record.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&PendingMemory> for PendingMemoryDTO {
    fn from(memory: &PendingMemory) -> Self {
        let (local_uri, note) = match &memory.content {
            MemoryContent::Text { note } => (None, Some(note.clone())),
            content => (
                content.local_uri().map(str::to_string),
                content.note().map(str::to_string),
            ),
        };

        PendingMemoryDTO {
            schema_version: PENDING_MEMORY_SCHEMA_VERSION.to_string(),
            id: memory.id.clone(),
            journey_id: memory.journey_id.clone(),
            user_id: memory.user_id.clone(),
            kind: memory.kind(),
            local_uri,
            note,
            duration: memory.content.duration_secs(),
            location: memory.location.clone(),
            weather: memory.weather.clone(),
            tags: memory.tags.clone(),
            status: memory.status,
            last_error: memory.last_error.clone(),
            attempts: memory.attempts,
            sequence: memory.sequence,
            created_at: memory.created_at,
        }
    }
}

impl TryFrom<PendingMemoryDTO> for PendingMemory {
    type Error = SunroofError;

    /// Rebuilds the domain record, re-checking the per-type field
    /// requirements so a hand-edited or truncated record cannot slip through.
    fn try_from(dto: PendingMemoryDTO) -> Result<Self> {
        check_schema_version(&dto.schema_version)?;

        if dto.id.trim().is_empty() {
            return Err(SunroofError::validation("stored record has no id"));
        }

        let content = NewPendingMemory {
            kind: Some(dto.kind),
            journey_id: dto.journey_id.clone(),
            user_id: dto.user_id.clone(),
            local_uri: dto.local_uri,
            note: dto.note,
            duration_secs: dto.duration,
            ..Default::default()
        }
        .content()?;

        Ok(PendingMemory {
            id: dto.id,
            journey_id: dto.journey_id,
            user_id: dto.user_id,
            content,
            location: dto.location,
            weather: dto.weather,
            tags: dto.tags,
            status: dto.status,
            last_error: dto.last_error,
            attempts: dto.attempts,
            sequence: dto.sequence,
            created_at: dto.created_at,
        })
    }
}

fn check_schema_version(raw: &str) -> Result<()> {
    let version = Version::parse(raw).map_err(|e| {
        SunroofError::serialization("JSON", format!("invalid schema_version '{}': {}", raw, e))
    })?;
    let current = Version::new(1, 0, 0);
    if version.major != current.major {
        return Err(SunroofError::serialization(
            "JSON",
            format!(
                "unsupported schema_version {} (reader understands {}.x)",
                version, current.major
            ),
        ));
    }
    Ok(())
}
