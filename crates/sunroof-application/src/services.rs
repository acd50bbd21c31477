//! Wires the store, queue, orchestrator and journey cache together.

use crate::journey_loader::JourneyListLoader;
use crate::sync::{MemoryUploader, SyncOrchestrator};
use crate::upload_queue::UploadQueue;
use std::sync::Arc;
use sunroof_core::config::RootConfig;
use sunroof_core::error::Result;
use sunroof_core::journey::{CachePolicy, JourneyCache, JourneyFetcher};
use sunroof_core::memory::{MediaReader, MemoryDatabase, ObjectStorage, PendingMemoryStore};
use sunroof_core::network::NetworkObserver;
use sunroof_core::storage::KeyValueStorage;
use sunroof_infrastructure::{
    DurablePendingMemoryStore, FileKeyValueStorage, FsMediaReader, InMemoryKeyValueStorage,
    SunroofPaths,
};

/// Backend-facing collaborators supplied by the host.
#[derive(Clone)]
pub struct RemoteCollaborators {
    pub object_storage: Arc<dyn ObjectStorage>,
    pub database: Arc<dyn MemoryDatabase>,
    pub journeys: Arc<dyn JourneyFetcher>,
    pub network: Arc<dyn NetworkObserver>,
}

/// Everything the UI layer needs, built once per process.
pub struct SyncServices {
    pub store: Arc<dyn PendingMemoryStore>,
    pub upload_queue: UploadQueue,
    pub orchestrator: SyncOrchestrator,
    pub journey_cache: Arc<JourneyCache>,
    journeys: Arc<dyn JourneyFetcher>,
}

impl SyncServices {
    /// Durable setup: records live under `paths.pending_store_dir()`.
    pub async fn open(
        paths: &SunroofPaths,
        config: &RootConfig,
        remote: RemoteCollaborators,
    ) -> Result<Self> {
        let storage = FileKeyValueStorage::open(paths.pending_store_dir()?).await?;
        Self::build(Arc::new(storage), Arc::new(FsMediaReader::new()), config, remote)
    }

    /// Process-lifetime setup; queued memories do not survive a restart.
    pub fn in_memory(
        config: &RootConfig,
        media: Arc<dyn MediaReader>,
        remote: RemoteCollaborators,
    ) -> Result<Self> {
        Self::build(
            Arc::new(InMemoryKeyValueStorage::new()),
            media,
            config,
            remote,
        )
    }

    fn build(
        storage: Arc<dyn KeyValueStorage>,
        media: Arc<dyn MediaReader>,
        config: &RootConfig,
        remote: RemoteCollaborators,
    ) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn PendingMemoryStore> = Arc::new(DurablePendingMemoryStore::new(storage));
        let uploader = MemoryUploader::new(
            media,
            remote.object_storage,
            remote.database,
            config.sync.upload_timeout(),
        );
        let orchestrator = SyncOrchestrator::new(
            store.clone(),
            remote.network,
            uploader,
            config.sync.clone(),
        );
        let journey_cache = Arc::new(JourneyCache::new(CachePolicy::from_config(&config.cache)?));

        Ok(Self {
            upload_queue: UploadQueue::new(store.clone()),
            store,
            orchestrator,
            journey_cache,
            journeys: remote.journeys,
        })
    }

    /// Initializes the store and starts the orchestrator.
    pub async fn start(&self) -> Result<()> {
        self.orchestrator.start().await
    }

    pub fn journey_loader(&self, user_id: impl Into<String>) -> JourneyListLoader {
        JourneyListLoader::new(user_id, self.journey_cache.clone(), self.journeys.clone())
    }

    /// Clears per-user state on sign-out. Queued memories are kept.
    pub fn sign_out(&self) {
        self.journey_cache.clear();
    }

    pub async fn shutdown(&self) {
        self.orchestrator.shutdown().await;
    }
}
