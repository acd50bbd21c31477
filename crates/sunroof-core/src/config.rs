//! Configuration model.
//!
//! Every field has a default, so a missing or empty `config.toml` still
//! yields a working configuration.

use crate::error::{Result, SunroofError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RootConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl RootConfig {
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.sync.validate()
    }
}

/// Tuning for the sync orchestrator.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound on one record's upload + create sequence.
    pub upload_timeout_secs: u64,
    /// How long connectivity has to hold before an automatic pass starts.
    pub settle_delay_ms: u64,
    /// First automatic-pass backoff after a pass that ended with failures.
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
    /// Move `failed` records back to `pending` before a manual pass.
    pub requeue_failed_on_manual_sync: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            upload_timeout_secs: 30,
            settle_delay_ms: 750,
            backoff_base_secs: 5,
            backoff_max_secs: 300,
            requeue_failed_on_manual_sync: true,
        }
    }
}

impl SyncConfig {
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upload_timeout_secs == 0 {
            return Err(SunroofError::config("sync.upload_timeout_secs must be > 0"));
        }
        if self.backoff_base_secs > self.backoff_max_secs {
            return Err(SunroofError::config(
                "sync.backoff_base_secs must not exceed sync.backoff_max_secs",
            ));
        }
        Ok(())
    }
}

/// Freshness windows for the journey read cache.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub stale_time_secs: u64,
    pub cache_time_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: 30,
            cache_time_secs: 300,
        }
    }
}

impl CacheConfig {
    /// Fails unless `stale_time < cache_time`.
    pub fn validate(&self) -> Result<()> {
        if self.stale_time_secs >= self.cache_time_secs {
            return Err(SunroofError::config(format!(
                "cache.stale_time_secs ({}) must be less than cache.cache_time_secs ({})",
                self.stale_time_secs, self.cache_time_secs
            )));
        }
        Ok(())
    }
}

/// Remote backend connection settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub media_bucket: String,
    /// Endpoint probed by the polling network observer.
    pub reachability_url: Option<String>,
    pub poll_interval_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            media_bucket: "memories".to_string(),
            reachability_url: None,
            poll_interval_secs: 15,
        }
    }
}
