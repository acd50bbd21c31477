//! Journey listing model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Which journey listing a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JourneyBucket {
    /// Journeys still collecting memories.
    Active,
    /// Journeys whose capture window has closed.
    Past,
}

/// A journey as listed by the server.
///
/// Only the fields the client orders or displays by are typed; everything
/// else the server sends is kept untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneySummary {
    pub id: String,
    pub name: String,
    pub unlock_date: DateTime<Utc>,
    #[serde(default)]
    pub memory_count: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
