//! Background sync: backoff, per-record upload and the orchestrator.

mod backoff;
mod orchestrator;
mod state;
mod uploader;

pub use backoff::Backoff;
pub use orchestrator::SyncOrchestrator;
pub use state::{OfflineState, SyncReport, SyncTrigger};
pub use uploader::{MemoryUploader, object_path};
