use async_trait::async_trait;
use std::sync::RwLock;
use sunroof_core::error::Result;
use sunroof_core::network::{NetworkObserver, NetworkState};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 16;

/// Network observer fed by the host platform.
///
/// The embedding app forwards OS connectivity callbacks into
/// [`ChannelNetworkObserver::set_state`]; subscribers only hear about actual
/// changes.
pub struct ChannelNetworkObserver {
    state: RwLock<NetworkState>,
    sender: broadcast::Sender<NetworkState>,
}

impl ChannelNetworkObserver {
    pub fn new(initial: NetworkState) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(initial),
            sender,
        }
    }

    pub fn current(&self) -> NetworkState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Records a new state and broadcasts it if it differs from the last one.
    pub fn set_state(&self, next: NetworkState) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if *state == next {
                return;
            }
            *state = next;
        }
        tracing::debug!(
            is_connected = next.is_connected,
            is_internet_reachable = ?next.is_internet_reachable,
            "[NetworkObserver] State changed"
        );
        // No receivers is fine.
        let _ = self.sender.send(next);
    }
}

impl Default for ChannelNetworkObserver {
    fn default() -> Self {
        Self::new(NetworkState::default())
    }
}

#[async_trait]
impl NetworkObserver for ChannelNetworkObserver {
    async fn fetch(&self) -> Result<NetworkState> {
        Ok(self.current())
    }

    fn subscribe(&self) -> broadcast::Receiver<NetworkState> {
        self.sender.subscribe()
    }
}
