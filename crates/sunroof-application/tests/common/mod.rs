#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sunroof_application::sync::MemoryUploader;
use sunroof_application::{OfflineState, PhotoCapture, SyncOrchestrator, UploadQueue};
use sunroof_core::config::SyncConfig;
use sunroof_core::error::{Result, SunroofError};
use sunroof_core::memory::{
    MediaReader, MemoryDatabase, MemoryRecord, NewMemoryRecord, ObjectStorage,
};
use sunroof_core::network::{NetworkObserver, NetworkState};
use sunroof_core::storage::KeyValueStorage;
use sunroof_infrastructure::{
    ChannelNetworkObserver, DurablePendingMemoryStore, InMemoryKeyValueStorage,
};
use tokio::sync::broadcast;

/// Backend fake: media reads, object uploads and record inserts, with
/// scripted failures and an optional connectivity drop.
#[derive(Default)]
pub struct ScriptedBackend {
    failing_uris: Mutex<HashSet<String>>,
    created: Mutex<Vec<NewMemoryRecord>>,
    objects: Mutex<Vec<String>>,
    create_delay: Mutex<Duration>,
    offline_after: Mutex<Option<(usize, Arc<ChannelNetworkObserver>)>>,
}

impl ScriptedBackend {
    pub fn fail_uri(&self, uri: &str) {
        self.failing_uris.lock().unwrap().insert(uri.to_string());
    }

    pub fn heal(&self) {
        self.failing_uris.lock().unwrap().clear();
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = delay;
    }

    /// Drops connectivity right after the `n`th record is created.
    pub fn go_offline_after(&self, n: usize, network: Arc<ChannelNetworkObserver>) {
        *self.offline_after.lock().unwrap() = Some((n, network));
    }

    pub fn created(&self) -> Vec<NewMemoryRecord> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_notes(&self) -> Vec<String> {
        self.created()
            .into_iter()
            .filter_map(|record| record.note)
            .collect()
    }

    pub fn objects(&self) -> Vec<String> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaReader for ScriptedBackend {
    async fn read(&self, local_uri: &str) -> Result<Vec<u8>> {
        if self.failing_uris.lock().unwrap().contains(local_uri) {
            return Err(SunroofError::network("connection reset by peer"));
        }
        Ok(local_uri.as_bytes().to_vec())
    }
}

#[async_trait]
impl ObjectStorage for ScriptedBackend {
    async fn upload(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        self.objects.lock().unwrap().push(path.to_string());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://storage.test/memories/{}", path)
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.objects.lock().unwrap().retain(|p| p != path);
        Ok(())
    }
}

#[async_trait]
impl MemoryDatabase for ScriptedBackend {
    async fn create_memory_record(&self, record: NewMemoryRecord) -> Result<MemoryRecord> {
        let delay = *self.create_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let count = {
            let mut created = self.created.lock().unwrap();
            created.push(record.clone());
            created.len()
        };

        let trip = self
            .offline_after
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(n, _)| *n == count)
            .map(|(_, network)| network.clone());
        if let Some(network) = trip {
            network.set_state(NetworkState::offline());
            // Let the orchestrator observe the transition before the next record.
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Ok(MemoryRecord {
            id: format!("remote-{}", count),
            journey_id: record.journey_id,
            media_url: record.media_url,
        })
    }
}

/// Network observer whose state changes are never broadcast; only `fetch`
/// sees them.
#[derive(Default)]
pub struct QuietNetwork {
    state: Mutex<NetworkState>,
    sender: Mutex<Option<broadcast::Sender<NetworkState>>>,
}

impl QuietNetwork {
    pub fn set(&self, state: NetworkState) {
        *self.state.lock().unwrap() = state;
    }
}

#[async_trait]
impl NetworkObserver for QuietNetwork {
    async fn fetch(&self) -> Result<NetworkState> {
        Ok(*self.state.lock().unwrap())
    }

    fn subscribe(&self) -> broadcast::Receiver<NetworkState> {
        let mut sender = self.sender.lock().unwrap();
        sender
            .get_or_insert_with(|| broadcast::channel(4).0)
            .subscribe()
    }
}

pub fn fast_sync_config() -> SyncConfig {
    SyncConfig {
        upload_timeout_secs: 5,
        settle_delay_ms: 0,
        backoff_base_secs: 0,
        backoff_max_secs: 0,
        requeue_failed_on_manual_sync: true,
    }
}

pub struct Harness {
    pub storage: Arc<InMemoryKeyValueStorage>,
    pub store: Arc<DurablePendingMemoryStore>,
    pub queue: UploadQueue,
    pub network: Arc<ChannelNetworkObserver>,
    pub backend: Arc<ScriptedBackend>,
    pub orchestrator: SyncOrchestrator,
}

impl Harness {
    pub fn new(initial: NetworkState) -> Self {
        Self::with_config(initial, fast_sync_config(), Arc::new(InMemoryKeyValueStorage::new()))
    }

    pub fn with_config(
        initial: NetworkState,
        config: SyncConfig,
        storage: Arc<InMemoryKeyValueStorage>,
    ) -> Self {
        let network = Arc::new(ChannelNetworkObserver::new(initial));
        let backend = Arc::new(ScriptedBackend::default());
        let kv: Arc<dyn KeyValueStorage> = storage.clone();
        let store = Arc::new(DurablePendingMemoryStore::new(kv));
        let orchestrator = SyncOrchestrator::new(
            store.clone(),
            network.clone(),
            uploader(&backend, config.upload_timeout()),
            config,
        );
        Self {
            storage,
            queue: UploadQueue::new(store.clone()),
            store,
            network,
            backend,
            orchestrator,
        }
    }

    pub async fn wait_for<F>(&self, predicate: F) -> OfflineState
    where
        F: Fn(&OfflineState) -> bool,
    {
        wait_for_state(&self.orchestrator, predicate).await
    }
}

pub fn uploader(backend: &Arc<ScriptedBackend>, timeout: Duration) -> MemoryUploader {
    MemoryUploader::new(backend.clone(), backend.clone(), backend.clone(), timeout)
}

pub async fn wait_for_state<F>(orchestrator: &SyncOrchestrator, predicate: F) -> OfflineState
where
    F: Fn(&OfflineState) -> bool,
{
    let mut rx = orchestrator.subscribe_state();
    tokio::time::timeout(Duration::from_secs(5), async {
        rx.wait_for(|state| predicate(state)).await.map(|state| state.clone())
    })
    .await
    .expect("timed out waiting for orchestrator state")
    .expect("orchestrator state channel closed")
}

/// Photo capture whose caption doubles as an ordering label.
pub fn photo(journey_id: &str, label: &str) -> PhotoCapture {
    PhotoCapture {
        journey_id: journey_id.to_string(),
        user_id: "user-1".to_string(),
        local_uri: format!("file:///captures/{}.jpg", label),
        caption: Some(label.to_string()),
        ..Default::default()
    }
}

pub fn photo_uri(label: &str) -> String {
    format!("file:///captures/{}.jpg", label)
}
