//! Application layer for Sunroof.
//!
//! Capture-time queueing, connectivity-driven background sync and cached
//! journey list loading, built on the domain traits in `sunroof-core`.

pub mod journey_loader;
pub mod services;
pub mod sync;
pub mod upload_queue;

pub use journey_loader::{JourneyListLoader, JourneyListState, LoadOutcome};
pub use services::{RemoteCollaborators, SyncServices};
pub use sync::{OfflineState, SyncOrchestrator, SyncReport, SyncTrigger};
pub use upload_queue::{ClipCapture, NoteCapture, PhotoCapture, UploadQueue};
