use chrono::{DateTime, Utc};
use std::fmt;

/// Aggregate sync state published to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineState {
    pub is_online: bool,
    /// Connected, but internet reachability is still being resolved.
    pub is_connecting: bool,
    pub pending_count: usize,
    pub is_syncing: bool,
    /// The app launched with queued memories and no pass has attempted them
    /// yet; the UI offers "Sync now".
    pub needs_manual_sync: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// What started a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Connectivity,
    Foreground,
    Manual,
}

impl SyncTrigger {
    pub fn is_automatic(self) -> bool {
        !matches!(self, SyncTrigger::Manual)
    }
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncTrigger::Connectivity => "connectivity",
            SyncTrigger::Foreground => "foreground",
            SyncTrigger::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records an upload was started for.
    pub attempted: usize,
    pub uploaded: usize,
    pub failed: usize,
    /// The pass stopped early because connectivity dropped or the
    /// orchestrator shut down.
    pub interrupted: bool,
    /// Another pass was already running; nothing was attempted.
    pub skipped: bool,
}

impl SyncReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    /// Ran to the end without a single failure.
    pub fn is_clean(&self) -> bool {
        !self.skipped && !self.interrupted && self.failed == 0
    }
}
