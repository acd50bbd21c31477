//! Pending-memory domain model.
//!
//! A pending memory is one captured artifact that has not yet been confirmed
//! persisted to the remote backend. Its payload is a tagged union over the
//! four capture modes so each variant carries only the fields it needs.

use crate::error::{Result, SunroofError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// The four capture modes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemoryKind {
    Photo,
    Video,
    Audio,
    Text,
}

impl MemoryKind {
    /// Whether a device-local media asset must accompany this kind.
    pub fn requires_media(self) -> bool {
        !matches!(self, MemoryKind::Text)
    }

    /// Whether this kind carries a duration.
    pub fn requires_duration(self) -> bool {
        matches!(self, MemoryKind::Video | MemoryKind::Audio)
    }

    /// Extension used for the remote object when the local path has none.
    pub fn default_extension(self) -> &'static str {
        match self {
            MemoryKind::Photo => "jpg",
            MemoryKind::Video => "mp4",
            MemoryKind::Audio => "m4a",
            MemoryKind::Text => "txt",
        }
    }

    /// Content type used when it cannot be guessed from the local path.
    pub fn default_content_type(self) -> &'static str {
        match self {
            MemoryKind::Photo => "image/jpeg",
            MemoryKind::Video => "video/mp4",
            MemoryKind::Audio => "audio/mp4",
            MemoryKind::Text => "text/plain",
        }
    }
}

/// Lifecycle state of a pending memory.
///
/// `pending → uploading → uploaded | failed`. `uploaded` is never stored:
/// the transition removes the record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemoryStatus {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

impl MemoryStatus {
    /// Whether the record counts toward "still needs to sync".
    pub fn needs_sync(self) -> bool {
        matches!(self, MemoryStatus::Pending | MemoryStatus::Uploading)
    }
}

/// Coordinates plus a human-readable place name, captured at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_name: Option<String>,
}

/// Weather at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub condition: String,
}

/// Type-specific payload of a memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryContent {
    Photo {
        local_uri: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Video {
        local_uri: String,
        duration_secs: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Audio {
        local_uri: String,
        duration_secs: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Text {
        note: String,
    },
}

impl MemoryContent {
    pub fn kind(&self) -> MemoryKind {
        match self {
            MemoryContent::Photo { .. } => MemoryKind::Photo,
            MemoryContent::Video { .. } => MemoryKind::Video,
            MemoryContent::Audio { .. } => MemoryKind::Audio,
            MemoryContent::Text { .. } => MemoryKind::Text,
        }
    }

    pub fn local_uri(&self) -> Option<&str> {
        match self {
            MemoryContent::Photo { local_uri, .. }
            | MemoryContent::Video { local_uri, .. }
            | MemoryContent::Audio { local_uri, .. } => Some(local_uri),
            MemoryContent::Text { .. } => None,
        }
    }

    /// The note for text memories, the caption otherwise.
    pub fn note(&self) -> Option<&str> {
        match self {
            MemoryContent::Photo { caption, .. }
            | MemoryContent::Video { caption, .. }
            | MemoryContent::Audio { caption, .. } => caption.as_deref(),
            MemoryContent::Text { note } => Some(note),
        }
    }

    pub fn duration_secs(&self) -> Option<f64> {
        match self {
            MemoryContent::Video { duration_secs, .. }
            | MemoryContent::Audio { duration_secs, .. } => Some(*duration_secs),
            _ => None,
        }
    }
}

/// A durable record of one not-yet-confirmed-uploaded memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMemory {
    /// Generated at creation, stable for the record's lifetime.
    pub id: String,
    pub journey_id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub content: MemoryContent,
    pub location: Option<GeoLocation>,
    pub weather: Option<WeatherSnapshot>,
    pub tags: Vec<String>,
    pub status: MemoryStatus,
    /// Diagnostic detail from the last failed upload attempt.
    pub last_error: Option<String>,
    /// Number of times the record entered `uploading`.
    pub attempts: u32,
    /// Store-assigned, strictly increasing; defines FIFO order.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl PendingMemory {
    pub fn kind(&self) -> MemoryKind {
        self.content.kind()
    }
}

/// Capture input accepted by the pending-memory store.
///
/// Loosely shaped on purpose: it mirrors what a capture screen has at hand.
/// [`NewPendingMemory::content`] checks the per-type requirements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewPendingMemory {
    pub kind: Option<MemoryKind>,
    pub journey_id: String,
    pub user_id: String,
    pub local_uri: Option<String>,
    pub note: Option<String>,
    pub duration_secs: Option<f64>,
    pub location: Option<GeoLocation>,
    pub weather: Option<WeatherSnapshot>,
    pub tags: Vec<String>,
}

impl NewPendingMemory {
    pub fn new(kind: MemoryKind, journey_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            journey_id: journey_id.into(),
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_local_uri(mut self, local_uri: impl Into<String>) -> Self {
        self.local_uri = Some(local_uri.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    pub fn with_location(mut self, location: Option<GeoLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn with_weather(mut self, weather: Option<WeatherSnapshot>) -> Self {
        self.weather = weather;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Validates the input and builds the type-specific payload.
    ///
    /// # Errors
    ///
    /// Returns `SunroofError::Validation` when the type, the owning ids, or a
    /// field required by the type is missing.
    pub fn content(&self) -> Result<MemoryContent> {
        let kind = self
            .kind
            .ok_or_else(|| SunroofError::validation("memory type is required"))?;

        if self.journey_id.trim().is_empty() {
            return Err(SunroofError::validation("journey_id is required"));
        }
        if self.user_id.trim().is_empty() {
            return Err(SunroofError::validation("user_id is required"));
        }

        let caption = non_blank(self.note.as_deref());

        let local_uri = if kind.requires_media() {
            non_blank(self.local_uri.as_deref()).ok_or_else(|| {
                SunroofError::validation(format!("local_uri is required for {} memories", kind))
            })?
        } else {
            String::new()
        };

        let duration_secs = if kind.requires_duration() {
            let duration = self.duration_secs.ok_or_else(|| {
                SunroofError::validation(format!("duration is required for {} memories", kind))
            })?;
            if !duration.is_finite() || duration < 0.0 {
                return Err(SunroofError::validation(format!(
                    "duration must be a non-negative number of seconds, got {}",
                    duration
                )));
            }
            duration
        } else {
            0.0
        };

        Ok(match kind {
            MemoryKind::Photo => MemoryContent::Photo { local_uri, caption },
            MemoryKind::Video => MemoryContent::Video {
                local_uri,
                duration_secs,
                caption,
            },
            MemoryKind::Audio => MemoryContent::Audio {
                local_uri,
                duration_secs,
                caption,
            },
            MemoryKind::Text => MemoryContent::Text {
                note: caption.ok_or_else(|| {
                    SunroofError::validation("note is required for text memories")
                })?,
            },
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trims labels, drops empty ones and removes duplicates (first occurrence wins).
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|existing| existing == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
