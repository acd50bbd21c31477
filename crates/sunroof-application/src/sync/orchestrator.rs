//! Connectivity-driven sync orchestrator.
//!
//! Watches network transitions and app lifecycle, drains the pending-memory
//! queue one record at a time in FIFO order, and publishes an
//! [`OfflineState`] for the UI.

use super::backoff::Backoff;
use super::state::{OfflineState, SyncReport, SyncTrigger};
use super::uploader::MemoryUploader;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sunroof_core::config::SyncConfig;
use sunroof_core::error::Result;
use sunroof_core::memory::{MemoryStatus, PendingMemory, PendingMemoryStore};
use sunroof_core::network::{NetworkObserver, NetworkState};
use sunroof_core::notify::Subscription;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct BackoffGate {
    backoff: Backoff,
    /// Automatic passes wait until this instant.
    not_before: Option<Instant>,
}

struct Inner {
    store: Arc<dyn PendingMemoryStore>,
    network: Arc<dyn NetworkObserver>,
    uploader: MemoryUploader,
    config: SyncConfig,
    state: Arc<watch::Sender<OfflineState>>,
    /// Held for the duration of a pass.
    pass_lock: tokio::sync::Mutex<()>,
    gate: Mutex<BackoffGate>,
    /// Bumped on every online → offline transition.
    offline_epoch: AtomicU64,
    auto_scheduled: AtomicBool,
    /// An automatic pass arrived while another pass held the lock.
    rerun_requested: AtomicBool,
    started: AtomicBool,
    cancel: CancellationToken,
    subscription: Mutex<Option<Subscription>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Decides when to sync, runs sync passes and exposes aggregate state.
///
/// # Lifecycle
///
/// 1. [`SyncOrchestrator::start`] initializes the store, reads the initial
///    network state and pending count, and subscribes to both.
/// 2. Offline → online transitions (and [`SyncOrchestrator::on_app_foreground`])
///    schedule an automatic pass after the settle delay and any backoff.
/// 3. [`SyncOrchestrator::trigger_manual_sync`] runs a pass immediately.
/// 4. [`SyncOrchestrator::shutdown`] cancels background work and drops every
///    subscription.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn PendingMemoryStore>,
        network: Arc<dyn NetworkObserver>,
        uploader: MemoryUploader,
        config: SyncConfig,
    ) -> Self {
        // Connectivity is unresolved until `start` reads it.
        let (state, _) = watch::channel(OfflineState {
            is_connecting: true,
            ..Default::default()
        });
        let backoff = Backoff::from_config(&config);
        Self {
            inner: Arc::new(Inner {
                store,
                network,
                uploader,
                config,
                state: Arc::new(state),
                pass_lock: tokio::sync::Mutex::new(()),
                gate: Mutex::new(BackoffGate {
                    backoff,
                    not_before: None,
                }),
                offline_epoch: AtomicU64::new(0),
                auto_scheduled: AtomicBool::new(false),
                rerun_requested: AtomicBool::new(false),
                started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                subscription: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Initializes the store and begins listening. Calling it again is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Propagates the store's `initialize()` failure; the orchestrator can be
    /// started again afterwards.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let setup = async {
            inner.store.initialize().await?;
            // Subscribe before the initial fetch so no transition is missed.
            let network_rx = inner.network.subscribe();
            let network = inner.fetch_network().await;
            let pending = inner.store.get_pending_count().await?;
            Ok::<_, sunroof_core::SunroofError>((network_rx, network, pending))
        };
        let (network_rx, network, pending) = match setup.await {
            Ok(ready) => ready,
            Err(e) => {
                inner.started.store(false, Ordering::SeqCst);
                tracing::error!("[SyncOrchestrator] Failed to start: {}", e);
                return Err(e);
            }
        };

        inner.state.send_modify(|s| {
            s.is_online = network.is_online();
            s.is_connecting = network.is_resolving();
            s.pending_count = pending;
            s.needs_manual_sync = pending > 0;
        });

        let sender = Arc::clone(&inner.state);
        let subscription = inner.store.subscribe(Box::new(move |count| {
            sender.send_modify(|s| s.pending_count = count);
        }));
        *inner.subscription.lock().unwrap_or_else(|e| e.into_inner()) = Some(subscription);

        let watcher = tokio::spawn(Arc::clone(inner).watch_network(network_rx));
        inner.track(watcher);

        tracing::info!(
            is_online = network.is_online(),
            pending,
            "[SyncOrchestrator] Started"
        );

        if network.is_online() && pending > 0 {
            inner.schedule_auto_pass(SyncTrigger::Connectivity);
        }
        Ok(())
    }

    /// Current state snapshot.
    pub fn state(&self) -> OfflineState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<OfflineState> {
        self.inner.state.subscribe()
    }

    pub async fn get_pending_for_journey(&self, journey_id: &str) -> Result<Vec<PendingMemory>> {
        self.inner.store.get_pending_for_journey(journey_id).await
    }

    /// Runs a pass now, regardless of connectivity and backoff.
    ///
    /// Failed records are moved back to pending first when
    /// `sync.requeue_failed_on_manual_sync` is set. Upload failures never
    /// surface here; they end up as `failed` records and in the report.
    pub async fn trigger_manual_sync(&self) -> SyncReport {
        self.inner.run_pass(SyncTrigger::Manual).await
    }

    /// Re-reads network state and the pending count when the app returns to
    /// the foreground, scheduling a pass if there is work and connectivity.
    pub async fn on_app_foreground(&self) -> Result<()> {
        let inner = &self.inner;
        let network = inner.fetch_network().await;
        inner.apply_network_state(network);

        let pending = inner.store.get_pending_count().await?;
        inner.state.send_modify(|s| s.pending_count = pending);

        if network.is_online() && pending > 0 {
            inner.schedule_auto_pass(SyncTrigger::Foreground);
        }
        Ok(())
    }

    /// Stops background work and unsubscribes from the store.
    ///
    /// A pass already uploading finishes its current record first.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        inner.cancel.cancel();

        let subscription = inner
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }

        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = inner.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *tasks)
        };
        for handle in handles {
            let _ = handle.await;
        }

        tracing::info!("[SyncOrchestrator] Shut down");
    }
}

impl Inner {
    async fn watch_network(self: Arc<Self>, mut rx: broadcast::Receiver<NetworkState>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                received = rx.recv() => match received {
                    Ok(next) => self.on_network_change(next),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "[SyncOrchestrator] Missed {} network event(s); re-fetching",
                            skipped
                        );
                        let current = self.fetch_network().await;
                        self.on_network_change(current);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("[SyncOrchestrator] Network observer closed");
                        break;
                    }
                },
            }
        }
    }

    fn on_network_change(self: &Arc<Self>, next: NetworkState) {
        let went_online = self.apply_network_state(next);
        if went_online && self.state.borrow().pending_count > 0 {
            self.schedule_auto_pass(SyncTrigger::Connectivity);
        }
    }

    /// Updates online flags; returns `true` on an offline → online transition.
    fn apply_network_state(&self, next: NetworkState) -> bool {
        let mut went_online = false;
        let mut went_offline = false;
        self.state.send_modify(|s| {
            let was_online = s.is_online;
            s.is_online = next.is_online();
            s.is_connecting = next.is_resolving();
            went_online = !was_online && s.is_online;
            went_offline = was_online && !s.is_online;
        });

        if went_offline {
            self.offline_epoch.fetch_add(1, Ordering::SeqCst);
            tracing::info!("[SyncOrchestrator] Went offline");
        }
        if went_online {
            tracing::info!("[SyncOrchestrator] Back online");
        }
        went_online
    }

    async fn fetch_network(&self) -> NetworkState {
        match self.network.fetch().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("[SyncOrchestrator] Network state unavailable: {}", e);
                NetworkState::default()
            }
        }
    }

    fn schedule_auto_pass(self: &Arc<Self>, trigger: SyncTrigger) {
        if self.cancel.is_cancelled() {
            return;
        }
        if self.auto_scheduled.swap(true, Ordering::SeqCst) {
            tracing::debug!("[SyncOrchestrator] Automatic pass already scheduled");
            return;
        }

        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let delay = inner.config.settle_delay() + inner.backoff_remaining();
            tracing::debug!(
                "[SyncOrchestrator] {} pass in {}ms",
                trigger,
                delay.as_millis()
            );

            tokio::select! {
                _ = inner.cancel.cancelled() => {
                    inner.auto_scheduled.store(false, Ordering::SeqCst);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            inner.auto_scheduled.store(false, Ordering::SeqCst);

            let network = inner.fetch_network().await;
            if !network.is_online() {
                tracing::debug!("[SyncOrchestrator] Connectivity did not settle; skipping pass");
                return;
            }
            inner.run_pass(trigger).await;
        });
        self.track(handle);
    }

    fn backoff_remaining(&self) -> Duration {
        let gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        gate.not_before
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    async fn run_pass(self: &Arc<Self>, trigger: SyncTrigger) -> SyncReport {
        let report = {
            let Ok(_pass) = self.pass_lock.try_lock() else {
                if trigger.is_automatic() {
                    self.rerun_requested.store(true, Ordering::SeqCst);
                }
                tracing::debug!("[SyncOrchestrator] Pass already running; skipping {} trigger", trigger);
                return SyncReport::skipped();
            };
            self.run_locked(trigger).await
        };

        // Checked after the lock is released so a trigger that lost the race
        // is either seen here or gets the lock itself.
        let rerun = self.rerun_requested.swap(false, Ordering::SeqCst) || report.interrupted;
        let state = self.state.borrow().clone();
        if rerun && state.is_online && state.pending_count > 0 {
            tracing::debug!("[SyncOrchestrator] Work left after {} pass; rescheduling", trigger);
            self.schedule_auto_pass(SyncTrigger::Connectivity);
        }
        report
    }

    async fn run_locked(&self, trigger: SyncTrigger) -> SyncReport {
        if self.cancel.is_cancelled() {
            return SyncReport {
                interrupted: true,
                ..Default::default()
            };
        }

        if trigger == SyncTrigger::Manual && self.config.requeue_failed_on_manual_sync {
            match self.store.requeue_failed_memories().await {
                Ok(0) => {}
                Ok(requeued) => {
                    tracing::info!("[SyncOrchestrator] Requeued {} failed record(s)", requeued)
                }
                Err(e) => tracing::warn!("[SyncOrchestrator] Could not requeue failed records: {}", e),
            }
        }

        let epoch = self.offline_epoch.load(Ordering::SeqCst);
        let online_at_start = self.state.borrow().is_online;
        self.state.send_modify(|s| {
            s.is_syncing = true;
            if online_at_start {
                s.needs_manual_sync = false;
            }
        });

        let report = self.drain(epoch).await;
        self.update_backoff(&report);

        let pending = self.store.get_pending_count().await.ok();
        let drained = pending == Some(0);
        self.state.send_modify(|s| {
            s.is_syncing = false;
            if let Some(count) = pending {
                s.pending_count = count;
            }
            if report.attempted > 0 || drained {
                s.needs_manual_sync = false;
            }
            if report.is_clean() {
                s.last_synced_at = Some(Utc::now());
            }
        });

        tracing::info!(
            trigger = %trigger,
            attempted = report.attempted,
            uploaded = report.uploaded,
            failed = report.failed,
            interrupted = report.interrupted,
            "[SyncOrchestrator] Pass finished"
        );
        report
    }

    /// Uploads every pending record in FIFO order, one at a time.
    async fn drain(&self, epoch: u64) -> SyncReport {
        let mut report = SyncReport::default();

        let records = match self.store.get_memories_to_sync().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("[SyncOrchestrator] Could not read the queue: {}", e);
                return report;
            }
        };

        for memory in records {
            if self.cancel.is_cancelled() || self.offline_epoch.load(Ordering::SeqCst) != epoch {
                tracing::info!("[SyncOrchestrator] Connectivity lost; stopping at record boundary");
                report.interrupted = true;
                break;
            }

            // The user may have discarded it since the queue was read.
            match self.store.get_memory(&memory.id).await {
                Ok(Some(current)) if current.status == MemoryStatus::Pending => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(id = %memory.id, "[SyncOrchestrator] Skipping record: {}", e);
                    continue;
                }
            }

            if let Err(e) = self
                .store
                .update_memory_status(&memory.id, MemoryStatus::Uploading, None)
                .await
            {
                tracing::warn!(id = %memory.id, "[SyncOrchestrator] Could not mark uploading: {}", e);
                continue;
            }
            report.attempted += 1;

            match self.uploader.upload(&memory).await {
                Ok(record) => {
                    report.uploaded += 1;
                    tracing::debug!(
                        id = %memory.id,
                        remote_id = %record.id,
                        "[SyncOrchestrator] Uploaded"
                    );
                    if let Err(e) = self
                        .store
                        .update_memory_status(&memory.id, MemoryStatus::Uploaded, None)
                        .await
                    {
                        tracing::error!(
                            id = %memory.id,
                            "[SyncOrchestrator] Uploaded but could not clear local record: {}",
                            e
                        );
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        id = %memory.id,
                        journey_id = %memory.journey_id,
                        "[SyncOrchestrator] Upload failed: {}",
                        e
                    );
                    if let Err(store_err) = self
                        .store
                        .update_memory_status(&memory.id, MemoryStatus::Failed, Some(e.to_string()))
                        .await
                    {
                        tracing::error!(
                            id = %memory.id,
                            "[SyncOrchestrator] Could not mark failed: {}",
                            store_err
                        );
                    }
                }
            }
        }

        report
    }

    fn update_backoff(&self, report: &SyncReport) {
        let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        if report.failed > 0 {
            let delay = gate.backoff.record_failure();
            gate.not_before = Some(Instant::now() + delay);
            tracing::info!(
                failures = gate.backoff.consecutive_failures(),
                "[SyncOrchestrator] Holding automatic sync for {}s",
                delay.as_secs()
            );
        } else if !report.interrupted {
            gate.backoff.reset();
            gate.not_before = None;
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }
}
