//! Durable pending-memory store over a [`KeyValueStorage`].
//!
//! Each record lives in its own storage slot (`pending_memory:<id>`), so a
//! crash can only ever lose or keep a whole record. An in-memory index loaded
//! by `initialize()` answers every query; all mutations go through a single
//! async mutex and hit storage before the index is updated.

use crate::dto::PendingMemoryDTO;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use sunroof_core::clock::{Clock, SystemClock};
use sunroof_core::error::{Result, SunroofError};
use sunroof_core::memory::{
    MemoryStatus, NewPendingMemory, PendingCountListener, PendingMemory, PendingMemoryStore,
    normalize_tags,
};
use sunroof_core::notify::{ListenerRegistry, Subscription};
use sunroof_core::storage::KeyValueStorage;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Storage key prefix for pending-memory slots.
pub const PENDING_MEMORY_KEY_PREFIX: &str = "pending_memory:";

struct StoreState {
    records: HashMap<String, PendingMemory>,
    next_sequence: u64,
}

impl StoreState {
    fn pending_count(&self) -> usize {
        self.records
            .values()
            .filter(|memory| memory.status.needs_sync())
            .count()
    }

    fn sorted<F>(&self, filter: F) -> Vec<PendingMemory>
    where
        F: Fn(&PendingMemory) -> bool,
    {
        let mut out: Vec<PendingMemory> = self
            .records
            .values()
            .filter(|memory| filter(memory))
            .cloned()
            .collect();
        out.sort_by_key(|memory| memory.sequence);
        out
    }
}

/// The production [`PendingMemoryStore`].
///
/// Construct one per application and share it behind an `Arc`.
pub struct DurablePendingMemoryStore {
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    state: Mutex<Option<StoreState>>,
    listeners: ListenerRegistry<usize>,
}

impl DurablePendingMemoryStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn KeyValueStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            state: Mutex::new(None),
            listeners: ListenerRegistry::new(),
        }
    }

    fn key_for(id: &str) -> String {
        format!("{}{}", PENDING_MEMORY_KEY_PREFIX, id)
    }

    async fn lock_initialized(&self) -> Result<MutexGuard<'_, Option<StoreState>>> {
        let guard = self.state.lock().await;
        if guard.is_none() {
            return Err(SunroofError::NotInitialized);
        }
        Ok(guard)
    }

    async fn persist(&self, memory: &PendingMemory) -> Result<()> {
        let json = PendingMemoryDTO::from(memory)
            .to_json()
            .map_err(|e| SunroofError::storage(format!("Failed to encode {}: {}", memory.id, e)))?;
        self.storage.set(&Self::key_for(&memory.id), &json).await
    }

    async fn load_record(&self, key: &str) -> Result<Option<PendingMemory>> {
        let Some(raw) = self.storage.get(key).await? else {
            return Ok(None);
        };
        let dto = PendingMemoryDTO::from_json(&raw)?;
        Ok(Some(PendingMemory::try_from(dto)?))
    }

    /// Reads every slot, skipping records that cannot be decoded.
    async fn load_all(&self) -> Result<StoreState> {
        let keys = self.storage.keys(PENDING_MEMORY_KEY_PREFIX).await?;
        let mut records = HashMap::with_capacity(keys.len());

        for key in keys {
            match self.load_record(&key).await {
                Ok(Some(memory)) => {
                    records.insert(memory.id.clone(), memory);
                }
                Ok(None) => {}
                Err(e) if e.is_storage() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        "[PendingMemoryStore] Skipping unreadable record: {}",
                        e
                    );
                }
            }
        }

        let next_sequence = records
            .values()
            .map(|memory| memory.sequence + 1)
            .max()
            .unwrap_or(0);

        Ok(StoreState {
            records,
            next_sequence,
        })
    }

    /// Brings records left behind by an interrupted run back into the queue.
    ///
    /// `uploading` means the process died mid-upload; `uploaded` should have
    /// been removed already.
    async fn recover_interrupted(&self, state: &mut StoreState) {
        let stuck: Vec<String> = state
            .records
            .values()
            .filter(|m| matches!(m.status, MemoryStatus::Uploading | MemoryStatus::Uploaded))
            .map(|m| m.id.clone())
            .collect();

        for id in stuck {
            let Some(memory) = state.records.get(&id).cloned() else {
                continue;
            };

            if memory.status == MemoryStatus::Uploaded {
                if let Err(e) = self.storage.remove(&Self::key_for(&id)).await {
                    tracing::warn!(id = %id, "[PendingMemoryStore] Failed to drop uploaded record: {}", e);
                }
                state.records.remove(&id);
                continue;
            }

            let mut reset = memory;
            reset.status = MemoryStatus::Pending;
            if let Err(e) = self.persist(&reset).await {
                tracing::warn!(id = %id, "[PendingMemoryStore] Failed to persist reset record: {}", e);
            }
            tracing::info!(id = %id, "[PendingMemoryStore] Reset interrupted upload to pending");
            state.records.insert(id, reset);
        }
    }

    fn notify(&self, state: &StoreState) {
        self.listeners.notify(state.pending_count());
    }
}

#[async_trait]
impl PendingMemoryStore for DurablePendingMemoryStore {
    async fn initialize(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut state = self.load_all().await?;
        self.recover_interrupted(&mut state).await;

        tracing::info!(
            "[PendingMemoryStore] Loaded {} record(s), {} awaiting sync",
            state.records.len(),
            state.pending_count()
        );

        self.notify(&state);
        *guard = Some(state);
        Ok(())
    }

    async fn add_pending_memory(&self, input: NewPendingMemory) -> Result<PendingMemory> {
        let content = input.content()?;
        let mut guard = self.lock_initialized().await?;
        let state = guard.as_mut().ok_or(SunroofError::NotInitialized)?;

        let memory = PendingMemory {
            id: Uuid::new_v4().to_string(),
            journey_id: input.journey_id,
            user_id: input.user_id,
            content,
            location: input.location,
            weather: input.weather,
            tags: normalize_tags(input.tags),
            status: MemoryStatus::Pending,
            last_error: None,
            attempts: 0,
            sequence: state.next_sequence,
            created_at: self.clock.now(),
        };

        if let Err(e) = self.persist(&memory).await {
            tracing::error!(
                journey_id = %memory.journey_id,
                "[PendingMemoryStore] Failed to persist new {} memory: {}",
                memory.kind(),
                e
            );
            return Err(e);
        }

        tracing::debug!(
            id = %memory.id,
            journey_id = %memory.journey_id,
            "[PendingMemoryStore] Queued {} memory",
            memory.kind()
        );

        state.next_sequence += 1;
        state.records.insert(memory.id.clone(), memory.clone());
        self.notify(state);
        Ok(memory)
    }

    async fn get_pending_count(&self) -> Result<usize> {
        let guard = self.lock_initialized().await?;
        Ok(guard.as_ref().map(StoreState::pending_count).unwrap_or(0))
    }

    async fn get_pending_for_journey(&self, journey_id: &str) -> Result<Vec<PendingMemory>> {
        let guard = self.lock_initialized().await?;
        Ok(guard
            .as_ref()
            .map(|state| state.sorted(|m| m.journey_id == journey_id))
            .unwrap_or_default())
    }

    async fn get_memories_to_sync(&self) -> Result<Vec<PendingMemory>> {
        let guard = self.lock_initialized().await?;
        Ok(guard
            .as_ref()
            .map(|state| state.sorted(|m| m.status == MemoryStatus::Pending))
            .unwrap_or_default())
    }

    async fn get_failed_memories(&self) -> Result<Vec<PendingMemory>> {
        let guard = self.lock_initialized().await?;
        Ok(guard
            .as_ref()
            .map(|state| state.sorted(|m| m.status == MemoryStatus::Failed))
            .unwrap_or_default())
    }

    async fn get_memory(&self, id: &str) -> Result<Option<PendingMemory>> {
        let guard = self.lock_initialized().await?;
        Ok(guard
            .as_ref()
            .and_then(|state| state.records.get(id).cloned()))
    }

    async fn update_memory_status(
        &self,
        id: &str,
        status: MemoryStatus,
        error_detail: Option<String>,
    ) -> Result<()> {
        let mut guard = self.lock_initialized().await?;
        let state = guard.as_mut().ok_or(SunroofError::NotInitialized)?;

        let Some(current) = state.records.get(id) else {
            tracing::debug!(
                id = %id,
                "[PendingMemoryStore] Ignoring {} update for unknown record",
                status
            );
            return Ok(());
        };

        if status == MemoryStatus::Uploaded {
            self.storage.remove(&Self::key_for(id)).await?;
            state.records.remove(id);
            tracing::debug!(id = %id, "[PendingMemoryStore] Uploaded; record removed");
            self.notify(state);
            return Ok(());
        }

        let mut updated = current.clone();
        updated.status = status;
        match status {
            MemoryStatus::Uploading => updated.attempts += 1,
            MemoryStatus::Failed => updated.last_error = error_detail,
            MemoryStatus::Pending => updated.last_error = None,
            MemoryStatus::Uploaded => {}
        }

        self.persist(&updated).await?;
        if status == MemoryStatus::Failed {
            tracing::warn!(
                id = %id,
                attempts = updated.attempts,
                "[PendingMemoryStore] Marked failed: {}",
                updated.last_error.as_deref().unwrap_or("no detail")
            );
        }
        state.records.insert(id.to_string(), updated);
        self.notify(state);
        Ok(())
    }

    async fn remove_pending_memory(&self, id: &str) -> Result<()> {
        let mut guard = self.lock_initialized().await?;
        let state = guard.as_mut().ok_or(SunroofError::NotInitialized)?;

        if !state.records.contains_key(id) {
            return Ok(());
        }

        self.storage.remove(&Self::key_for(id)).await?;
        state.records.remove(id);
        tracing::debug!(id = %id, "[PendingMemoryStore] Removed record");
        self.notify(state);
        Ok(())
    }

    async fn clear_failed_memories(&self) -> Result<usize> {
        let mut guard = self.lock_initialized().await?;
        let state = guard.as_mut().ok_or(SunroofError::NotInitialized)?;

        let failed: Vec<String> = state
            .sorted(|m| m.status == MemoryStatus::Failed)
            .into_iter()
            .map(|m| m.id)
            .collect();

        let mut removed = 0;
        let mut outcome = Ok(());
        for id in failed {
            if let Err(e) = self.storage.remove(&Self::key_for(&id)).await {
                outcome = Err(e);
                break;
            }
            state.records.remove(&id);
            removed += 1;
        }

        if removed > 0 {
            tracing::info!("[PendingMemoryStore] Cleared {} failed record(s)", removed);
            self.notify(state);
        }
        outcome.map(|_| removed)
    }

    async fn requeue_failed_memories(&self) -> Result<usize> {
        let mut guard = self.lock_initialized().await?;
        let state = guard.as_mut().ok_or(SunroofError::NotInitialized)?;

        let failed = state.sorted(|m| m.status == MemoryStatus::Failed);

        let mut requeued = 0;
        let mut outcome = Ok(());
        for mut memory in failed {
            memory.status = MemoryStatus::Pending;
            memory.last_error = None;
            if let Err(e) = self.persist(&memory).await {
                outcome = Err(e);
                break;
            }
            state.records.insert(memory.id.clone(), memory);
            requeued += 1;
        }

        if requeued > 0 {
            tracing::info!("[PendingMemoryStore] Requeued {} failed record(s)", requeued);
            self.notify(state);
        }
        outcome.map(|_| requeued)
    }

    fn subscribe(&self, listener: PendingCountListener) -> Subscription {
        self.listeners.subscribe(move |count| listener(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileKeyValueStorage, InMemoryKeyValueStorage};
    use chrono::Duration;
    use std::sync::Mutex as StdMutex;
    use sunroof_core::clock::ManualClock;
    use sunroof_core::memory::{MemoryKind, WeatherSnapshot};
    use tempfile::TempDir;

    fn photo(journey: &str) -> NewPendingMemory {
        NewPendingMemory::new(MemoryKind::Photo, journey, "user-1")
            .with_local_uri(format!("file:///captures/{}.jpg", journey))
    }

    async fn initialized(storage: Arc<dyn KeyValueStorage>) -> DurablePendingMemoryStore {
        let store = DurablePendingMemoryStore::new(storage);
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_operations_before_initialize_fail() {
        let store = DurablePendingMemoryStore::new(Arc::new(InMemoryKeyValueStorage::new()));

        assert!(store.get_pending_count().await.unwrap_err().is_not_initialized());
        assert!(
            store
                .add_pending_memory(photo("j"))
                .await
                .unwrap_err()
                .is_not_initialized()
        );
        assert!(
            store
                .remove_pending_memory("x")
                .await
                .unwrap_err()
                .is_not_initialized()
        );
    }

    #[tokio::test]
    async fn test_add_assigns_id_status_and_timestamp() {
        let clock = ManualClock::default();
        let store = DurablePendingMemoryStore::with_clock(
            Arc::new(InMemoryKeyValueStorage::new()),
            Arc::new(clock.clone()),
        );
        store.initialize().await.unwrap();

        let memory = store
            .add_pending_memory(photo("j1").with_tags(vec![" a ".into(), "a".into()]))
            .await
            .unwrap();

        assert!(!memory.id.is_empty());
        assert_eq!(memory.status, MemoryStatus::Pending);
        assert_eq!(memory.created_at, clock.now());
        assert_eq!(memory.tags, vec!["a"]);
        assert_eq!(store.get_pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_validation_error_persists_nothing() {
        let storage = Arc::new(InMemoryKeyValueStorage::new());
        let store = initialized(storage.clone()).await;

        let err = store
            .add_pending_memory(NewPendingMemory::new(MemoryKind::Video, "j", "u"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_on_add_is_surfaced() {
        let storage = Arc::new(InMemoryKeyValueStorage::new());
        let store = initialized(storage.clone()).await;

        storage.set_fail_writes(true);
        let err = store.add_pending_memory(photo("j")).await.unwrap_err();
        assert!(err.is_storage());
        assert_eq!(store.get_pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_survive_restart() {
        let temp_dir = TempDir::new().unwrap();
        let mut before = Vec::new();
        {
            let storage = Arc::new(FileKeyValueStorage::open(temp_dir.path()).await.unwrap());
            let store = initialized(storage).await;
            before.push(store.add_pending_memory(photo("j1")).await.unwrap());
            before.push(
                store
                    .add_pending_memory(
                        NewPendingMemory::new(MemoryKind::Audio, "j1", "user-1")
                            .with_local_uri("file:///a.m4a")
                            .with_duration(42.0)
                            .with_weather(Some(WeatherSnapshot {
                                temperature: 18.5,
                                condition: "cloudy".into(),
                            })),
                    )
                    .await
                    .unwrap(),
            );
            before.push(
                store
                    .add_pending_memory(
                        NewPendingMemory::new(MemoryKind::Text, "j1", "user-1").with_note("hello"),
                    )
                    .await
                    .unwrap(),
            );
        }

        let storage = Arc::new(FileKeyValueStorage::open(temp_dir.path()).await.unwrap());
        let store = initialized(storage).await;
        assert_eq!(store.get_pending_for_journey("j1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_sync_order_is_fifo_across_journeys() {
        let store = initialized(Arc::new(InMemoryKeyValueStorage::new())).await;
        let first = store.add_pending_memory(photo("j-b")).await.unwrap();
        let second = store.add_pending_memory(photo("j-a")).await.unwrap();
        let third = store.add_pending_memory(photo("j-b")).await.unwrap();

        let ids: Vec<String> = store
            .get_memories_to_sync()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
    }

    #[tokio::test]
    async fn test_sequence_continues_after_restart() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(InMemoryKeyValueStorage::new());
        let store = initialized(storage.clone()).await;
        let older = store.add_pending_memory(photo("j")).await.unwrap();

        let reopened = initialized(storage).await;
        let newer = reopened.add_pending_memory(photo("j")).await.unwrap();
        assert!(newer.sequence > older.sequence);
    }

    #[tokio::test]
    async fn test_uploaded_removes_and_never_reappears() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(InMemoryKeyValueStorage::new());
        let store = initialized(storage.clone()).await;
        let memory = store.add_pending_memory(photo("j")).await.unwrap();

        store
            .update_memory_status(&memory.id, MemoryStatus::Uploading, None)
            .await
            .unwrap();
        store
            .update_memory_status(&memory.id, MemoryStatus::Uploaded, None)
            .await
            .unwrap();
        store
            .update_memory_status(&memory.id, MemoryStatus::Failed, Some("late".into()))
            .await
            .unwrap();

        assert!(store.get_memory(&memory.id).await.unwrap().is_none());
        assert!(store.get_failed_memories().await.unwrap().is_empty());
        assert!(store.get_pending_for_journey("j").await.unwrap().is_empty());

        let reopened = initialized(storage).await;
        assert!(reopened.get_memory(&memory.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_is_excluded_from_count_but_queryable() {
        let store = initialized(Arc::new(InMemoryKeyValueStorage::new())).await;
        let a = store.add_pending_memory(photo("j")).await.unwrap();
        let _b = store.add_pending_memory(photo("j")).await.unwrap();

        store
            .update_memory_status(&a.id, MemoryStatus::Uploading, None)
            .await
            .unwrap();
        assert_eq!(store.get_pending_count().await.unwrap(), 2);

        store
            .update_memory_status(&a.id, MemoryStatus::Failed, Some("HTTP 503".into()))
            .await
            .unwrap();
        assert_eq!(store.get_pending_count().await.unwrap(), 1);

        let failed = store.get_failed_memories().await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].last_error.as_deref(), Some("HTTP 503"));
        assert_eq!(failed[0].attempts, 1);
        assert_eq!(store.get_pending_for_journey("j").await.unwrap().len(), 2);
        assert_eq!(store.get_memories_to_sync().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = initialized(Arc::new(InMemoryKeyValueStorage::new())).await;
        let memory = store.add_pending_memory(photo("j")).await.unwrap();

        store.remove_pending_memory(&memory.id).await.unwrap();
        store.remove_pending_memory(&memory.id).await.unwrap();
        store.remove_pending_memory("never-existed").await.unwrap();
        assert_eq!(store.get_pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_and_requeue_failed() {
        let store = initialized(Arc::new(InMemoryKeyValueStorage::new())).await;
        let a = store.add_pending_memory(photo("j")).await.unwrap();
        let b = store.add_pending_memory(photo("j")).await.unwrap();
        let c = store.add_pending_memory(photo("j")).await.unwrap();
        for id in [&a.id, &b.id] {
            store
                .update_memory_status(id, MemoryStatus::Failed, Some("boom".into()))
                .await
                .unwrap();
        }

        assert_eq!(store.requeue_failed_memories().await.unwrap(), 2);
        let to_sync = store.get_memories_to_sync().await.unwrap();
        assert_eq!(to_sync.len(), 3);
        assert!(to_sync.iter().all(|m| m.last_error.is_none()));

        store
            .update_memory_status(&c.id, MemoryStatus::Failed, None)
            .await
            .unwrap();
        assert_eq!(store.clear_failed_memories().await.unwrap(), 1);
        assert!(store.get_memory(&c.id).await.unwrap().is_none());
        assert_eq!(store.clear_failed_memories().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_interrupted_upload_is_reset_on_initialize() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(InMemoryKeyValueStorage::new());
        let store = initialized(storage.clone()).await;
        let memory = store.add_pending_memory(photo("j")).await.unwrap();
        store
            .update_memory_status(&memory.id, MemoryStatus::Uploading, None)
            .await
            .unwrap();

        let reopened = initialized(storage.clone()).await;
        let restored = reopened.get_memory(&memory.id).await.unwrap().unwrap();
        assert_eq!(restored.status, MemoryStatus::Pending);
        assert_eq!(restored.attempts, 1);

        let raw = storage
            .get(&DurablePendingMemoryStore::key_for(&memory.id))
            .await
            .unwrap()
            .unwrap();
        assert!(raw.contains("\"status\":\"pending\""));
    }

    #[tokio::test]
    async fn test_corrupt_records_are_skipped() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(InMemoryKeyValueStorage::new());
        {
            let store = initialized(storage.clone()).await;
            store.add_pending_memory(photo("j")).await.unwrap();
        }
        storage
            .set("pending_memory:garbage", "{not json")
            .await
            .unwrap();

        let store = initialized(storage).await;
        assert_eq!(store.get_pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_listeners_see_count_after_each_mutation() {
        let store = initialized(Arc::new(InMemoryKeyValueStorage::new())).await;
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = store.subscribe(Box::new(move |count| sink.lock().unwrap().push(count)));

        let a = store.add_pending_memory(photo("j")).await.unwrap();
        let b = store.add_pending_memory(photo("j")).await.unwrap();
        store
            .update_memory_status(&a.id, MemoryStatus::Uploaded, None)
            .await
            .unwrap();
        store
            .update_memory_status(&b.id, MemoryStatus::Failed, None)
            .await
            .unwrap();

        subscription.unsubscribe();
        store.add_pending_memory(photo("j")).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1, 0]);
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_break_mutation() {
        let store = initialized(Arc::new(InMemoryKeyValueStorage::new())).await;
        let _bad = store.subscribe(Box::new(|_| panic!("listener bug")));
        let seen = Arc::new(StdMutex::new(0usize));
        let sink = Arc::clone(&seen);
        let _good = store.subscribe(Box::new(move |count| *sink.lock().unwrap() = count));

        store.add_pending_memory(photo("j")).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_remove_and_status_update_do_not_resurrect() {
        let store = Arc::new(initialized(Arc::new(InMemoryKeyValueStorage::new())).await);

        for _ in 0..20 {
            let memory = store.add_pending_memory(photo("j")).await.unwrap();
            let remover = {
                let store = Arc::clone(&store);
                let id = memory.id.clone();
                tokio::spawn(async move { store.remove_pending_memory(&id).await })
            };
            let updater = {
                let store = Arc::clone(&store);
                let id = memory.id.clone();
                tokio::spawn(async move {
                    store
                        .update_memory_status(&id, MemoryStatus::Failed, Some("x".into()))
                        .await
                })
            };
            remover.await.unwrap().unwrap();
            updater.await.unwrap().unwrap();
            assert!(store.get_memory(&memory.id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_created_at_follows_clock() {
        let clock = ManualClock::default();
        let store = DurablePendingMemoryStore::with_clock(
            Arc::new(InMemoryKeyValueStorage::new()),
            Arc::new(clock.clone()),
        );
        store.initialize().await.unwrap();

        let first = store.add_pending_memory(photo("j")).await.unwrap();
        clock.advance(Duration::minutes(5));
        let second = store.add_pending_memory(photo("j")).await.unwrap();
        assert_eq!(second.created_at - first.created_at, Duration::minutes(5));
    }
}
