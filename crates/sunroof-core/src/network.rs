//! Network-state observation.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A snapshot of device connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkState {
    pub is_connected: bool,
    /// `None` while reachability has not been determined yet.
    pub is_internet_reachable: Option<bool>,
}

impl NetworkState {
    pub fn online() -> Self {
        Self {
            is_connected: true,
            is_internet_reachable: Some(true),
        }
    }

    pub fn offline() -> Self {
        Self {
            is_connected: false,
            is_internet_reachable: Some(false),
        }
    }

    /// Connected and confirmed able to reach the internet.
    pub fn is_online(&self) -> bool {
        self.is_connected && self.is_internet_reachable == Some(true)
    }

    /// Connected, but reachability is still being resolved.
    pub fn is_resolving(&self) -> bool {
        self.is_connected && self.is_internet_reachable.is_none()
    }
}

/// Source of connectivity state and change events.
///
/// Dropping the receiver returned by `subscribe` unsubscribes.
#[async_trait]
pub trait NetworkObserver: Send + Sync {
    async fn fetch(&self) -> Result<NetworkState>;

    fn subscribe(&self) -> broadcast::Receiver<NetworkState>;
}
