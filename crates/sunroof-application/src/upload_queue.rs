//! Typed capture entry points over the pending-memory store.

use std::sync::Arc;
use sunroof_core::error::Result;
use sunroof_core::memory::{
    GeoLocation, MemoryKind, NewPendingMemory, PendingCountListener, PendingMemory,
    PendingMemoryStore, WeatherSnapshot,
};
use sunroof_core::notify::Subscription;

/// A captured photo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoCapture {
    pub journey_id: String,
    pub user_id: String,
    pub local_uri: String,
    pub caption: Option<String>,
    pub location: Option<GeoLocation>,
    pub weather: Option<WeatherSnapshot>,
    pub tags: Vec<String>,
}

/// A captured video or audio clip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipCapture {
    pub journey_id: String,
    pub user_id: String,
    pub local_uri: String,
    pub duration_secs: f64,
    pub caption: Option<String>,
    pub location: Option<GeoLocation>,
    pub weather: Option<WeatherSnapshot>,
    pub tags: Vec<String>,
}

/// A written note.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteCapture {
    pub journey_id: String,
    pub user_id: String,
    pub note: String,
    pub location: Option<GeoLocation>,
    pub weather: Option<WeatherSnapshot>,
    pub tags: Vec<String>,
}

/// Capture-time facade over [`PendingMemoryStore`].
///
/// Each `add_*` returns as soon as the record is durably written locally;
/// nothing here waits on the network.
#[derive(Clone)]
pub struct UploadQueue {
    store: Arc<dyn PendingMemoryStore>,
}

impl UploadQueue {
    pub fn new(store: Arc<dyn PendingMemoryStore>) -> Self {
        Self { store }
    }

    pub async fn add_photo(&self, capture: PhotoCapture) -> Result<PendingMemory> {
        let mut input = NewPendingMemory::new(MemoryKind::Photo, capture.journey_id, capture.user_id)
            .with_local_uri(capture.local_uri)
            .with_location(capture.location)
            .with_weather(capture.weather)
            .with_tags(capture.tags);
        input.note = capture.caption;
        self.store.add_pending_memory(input).await
    }

    pub async fn add_video(&self, capture: ClipCapture) -> Result<PendingMemory> {
        self.add_clip(MemoryKind::Video, capture).await
    }

    pub async fn add_audio(&self, capture: ClipCapture) -> Result<PendingMemory> {
        self.add_clip(MemoryKind::Audio, capture).await
    }

    pub async fn add_note(&self, capture: NoteCapture) -> Result<PendingMemory> {
        let input = NewPendingMemory::new(MemoryKind::Text, capture.journey_id, capture.user_id)
            .with_note(capture.note)
            .with_location(capture.location)
            .with_weather(capture.weather)
            .with_tags(capture.tags);
        self.store.add_pending_memory(input).await
    }

    /// Number of memories still waiting to sync.
    pub async fn get_queue_length(&self) -> Result<usize> {
        self.store.get_pending_count().await
    }

    pub fn subscribe(&self, listener: PendingCountListener) -> Subscription {
        self.store.subscribe(listener)
    }

    async fn add_clip(&self, kind: MemoryKind, capture: ClipCapture) -> Result<PendingMemory> {
        let mut input = NewPendingMemory::new(kind, capture.journey_id, capture.user_id)
            .with_local_uri(capture.local_uri)
            .with_duration(capture.duration_secs)
            .with_location(capture.location)
            .with_weather(capture.weather)
            .with_tags(capture.tags);
        input.note = capture.caption;
        self.store.add_pending_memory(input).await
    }
}
