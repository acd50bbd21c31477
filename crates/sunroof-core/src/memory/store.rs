//! Pending-memory store trait.

use super::model::{MemoryStatus, NewPendingMemory, PendingMemory};
use crate::error::Result;
use crate::notify::Subscription;
use async_trait::async_trait;

/// Listener invoked with the current pending count after every mutation.
pub type PendingCountListener = Box<dyn Fn(usize) + Send + Sync>;

/// The single authority for queued-but-not-confirmed memory records.
///
/// Every async operation fails with `SunroofError::NotInitialized` until
/// [`PendingMemoryStore::initialize`] has completed. Implementations must
/// serialise mutations so that a UI-triggered removal and a sync-triggered
/// status update on the same id never lose an update.
#[async_trait]
pub trait PendingMemoryStore: Send + Sync {
    /// Loads persisted records. Safe to call more than once.
    async fn initialize(&self) -> Result<()>;

    /// Persists a new record with a fresh id, `status = pending`.
    ///
    /// # Errors
    ///
    /// - `Validation` when a field required by the memory type is missing
    /// - `Storage` when the durable write fails
    async fn add_pending_memory(&self, input: NewPendingMemory) -> Result<PendingMemory>;

    /// Count of records in `pending` or `uploading`.
    async fn get_pending_count(&self) -> Result<usize>;

    /// All non-uploaded records of a journey, in creation order.
    async fn get_pending_for_journey(&self, journey_id: &str) -> Result<Vec<PendingMemory>>;

    /// All `pending` records across journeys, oldest first.
    async fn get_memories_to_sync(&self) -> Result<Vec<PendingMemory>>;

    /// All `failed` records, oldest first.
    async fn get_failed_memories(&self) -> Result<Vec<PendingMemory>>;

    async fn get_memory(&self, id: &str) -> Result<Option<PendingMemory>>;

    /// Transitions a record's status.
    ///
    /// `Uploaded` removes the record. `Failed` keeps it with `error_detail`.
    /// Updating an id that no longer exists is a no-op.
    async fn update_memory_status(
        &self,
        id: &str,
        status: MemoryStatus,
        error_detail: Option<String>,
    ) -> Result<()>;

    /// Hard delete. Removing an unknown id is a no-op.
    async fn remove_pending_memory(&self, id: &str) -> Result<()>;

    /// Removes every `failed` record and returns how many were removed.
    async fn clear_failed_memories(&self) -> Result<usize>;

    /// Moves every `failed` record back to `pending` and returns how many moved.
    async fn requeue_failed_memories(&self) -> Result<usize>;

    /// Registers a pending-count listener.
    fn subscribe(&self, listener: PendingCountListener) -> Subscription;
}
