//! Reachability polling for hosts without a push connectivity stream.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use sunroof_core::config::BackendConfig;
use sunroof_core::error::{Result, SunroofError};
use sunroof_core::network::{NetworkObserver, NetworkState};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const CHANNEL_CAPACITY: usize = 16;

/// Probes a URL on an interval and broadcasts connectivity changes.
///
/// Any HTTP response counts as reachable; a transport failure counts as
/// offline. Until the first probe completes the state is "connected,
/// reachability unknown".
pub struct PollingNetworkObserver {
    client: Client,
    probe_url: String,
    interval: Duration,
    state: RwLock<NetworkState>,
    sender: broadcast::Sender<NetworkState>,
    started: AtomicBool,
    cancel: CancellationToken,
}

impl PollingNetworkObserver {
    pub fn new(probe_url: impl Into<String>, interval: Duration) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            client: Client::new(),
            probe_url: probe_url.into(),
            interval,
            state: RwLock::new(NetworkState {
                is_connected: true,
                is_internet_reachable: None,
            }),
            sender,
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Probes `backend.reachability_url`, falling back to the backend's
    /// health endpoint.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let probe_url = match (&config.reachability_url, &config.url) {
            (Some(url), _) => url.clone(),
            (None, Some(base)) => format!("{}/rest/v1/", base.trim_end_matches('/')),
            (None, None) => {
                return Err(SunroofError::config(
                    "backend.reachability_url or backend.url must be set",
                ));
            }
        };
        Ok(Self::new(
            probe_url,
            Duration::from_secs(config.poll_interval_secs.max(1)),
        ))
    }

    pub fn current(&self) -> NetworkState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts the polling loop. Calling it again returns `None`.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("[PollingNetworkObserver] Already running, skipping start");
            return None;
        }

        tracing::info!(
            "[PollingNetworkObserver] Polling {} every {}s",
            self.probe_url,
            self.interval.as_secs()
        );

        let observer = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(observer.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = observer.cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let next = observer.probe().await;
                        observer.publish(next);
                    }
                }
            }
            tracing::debug!("[PollingNetworkObserver] Stopped");
        }))
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    async fn probe(&self) -> NetworkState {
        match self
            .client
            .get(&self.probe_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(_) => NetworkState::online(),
            Err(e) => {
                tracing::debug!("[PollingNetworkObserver] Probe failed: {}", e);
                NetworkState::offline()
            }
        }
    }

    fn publish(&self, next: NetworkState) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if *state == next {
                return;
            }
            *state = next;
        }
        tracing::info!(
            is_online = next.is_online(),
            "[PollingNetworkObserver] Connectivity changed"
        );
        let _ = self.sender.send(next);
    }
}

#[async_trait]
impl NetworkObserver for PollingNetworkObserver {
    async fn fetch(&self) -> Result<NetworkState> {
        let next = self.probe().await;
        self.publish(next);
        Ok(next)
    }

    fn subscribe(&self) -> broadcast::Receiver<NetworkState> {
        self.sender.subscribe()
    }
}
