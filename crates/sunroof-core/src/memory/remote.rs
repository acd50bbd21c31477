//! Remote collaborators the sync orchestrator uploads through.
//!
//! These traits abstract the backend-as-a-service so the uploader can be
//! exercised against scripted fakes and swapped between REST and other
//! transports.

use super::model::{GeoLocation, MemoryKind, PendingMemory, WeatherSnapshot};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields of a remote memory row, as sent to the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMemoryRecord {
    pub journey_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

impl NewMemoryRecord {
    /// Builds the remote row for `memory`, pointing at `media_url` when the
    /// memory carried an uploaded asset.
    pub fn from_pending(memory: &PendingMemory, media_url: Option<String>) -> Self {
        Self {
            journey_id: memory.journey_id.clone(),
            user_id: memory.user_id.clone(),
            kind: memory.kind(),
            media_url,
            note: memory.content.note().map(str::to_string),
            duration: memory.content.duration_secs(),
            location: memory.location.clone(),
            weather: memory.weather.clone(),
            tags: memory.tags.clone(),
            captured_at: memory.created_at,
        }
    }
}

/// A memory row as returned by the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub journey_id: String,
    #[serde(default)]
    pub media_url: Option<String>,
}

/// Remote object storage for media binaries.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    fn public_url(&self, path: &str) -> String;

    async fn remove(&self, path: &str) -> Result<()>;
}

/// Remote database holding the memory rows.
#[async_trait]
pub trait MemoryDatabase: Send + Sync {
    async fn create_memory_record(&self, record: NewMemoryRecord) -> Result<MemoryRecord>;
}

/// Reads the bytes of a device-local media asset.
#[async_trait]
pub trait MediaReader: Send + Sync {
    async fn read(&self, local_uri: &str) -> Result<Vec<u8>>;
}
