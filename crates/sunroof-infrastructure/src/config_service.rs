//! Configuration service.
//!
//! Loads `RootConfig` from `config.toml`, applies environment overrides and
//! caches the result.

use crate::paths::SunroofPaths;
use crate::storage::AtomicTomlFile;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use sunroof_core::config::RootConfig;
use sunroof_core::error::Result;

/// Overrides `backend.url`.
pub const ENV_BACKEND_URL: &str = "SUNROOF_BACKEND_URL";
/// Overrides `backend.api_key`.
pub const ENV_BACKEND_API_KEY: &str = "SUNROOF_BACKEND_API_KEY";

/// Loads and caches the root configuration.
#[derive(Clone)]
pub struct ConfigService {
    file: Arc<AtomicTomlFile<RootConfig>>,
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicTomlFile::new(config_path)),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_paths(paths: &SunroofPaths) -> Result<Self> {
        Ok(Self::new(paths.config_file()?))
    }

    /// Returns the configuration, loading it on first access.
    ///
    /// Falls back to defaults (and logs why) when the file is unreadable or
    /// invalid, so the sync subsystem can always start.
    pub fn get_config(&self) -> RootConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match self.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[ConfigService] Using default configuration: {}", e);
                apply_env_overrides(RootConfig::default(), |key| std::env::var(key).ok())
            }
        };

        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Reads the file, writing defaults first if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed TOML and `Config` when the values
    /// fail validation.
    pub fn load(&self) -> Result<RootConfig> {
        let config = match self.file.load()? {
            Some(config) => config,
            None => {
                let default_config = RootConfig::default();
                if let Err(e) = self.file.save(&default_config) {
                    tracing::warn!(
                        "[ConfigService] Could not write default config to {}: {}",
                        self.file.path().display(),
                        e
                    );
                }
                default_config
            }
        };

        let config = apply_env_overrides(config, |key| std::env::var(key).ok());
        config.validate()?;
        tracing::debug!(
            backend_url = ?config.backend.url,
            api_key_set = config.backend.api_key.is_some(),
            "[ConfigService] Loaded {}",
            self.file.path().display()
        );
        Ok(config)
    }

    /// Validates and persists `config`, then drops the cached copy.
    pub fn save_config(&self, config: &RootConfig) -> Result<()> {
        config.validate()?;
        self.file.update(RootConfig::default(), |current| {
            *current = config.clone();
            Ok(())
        })?;
        self.invalidate_cache();
        Ok(())
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }
}

/// Applies `SUNROOF_BACKEND_*` overrides looked up through `lookup`.
pub fn apply_env_overrides<F>(mut config: RootConfig, lookup: F) -> RootConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
        config.backend.url = Some(url);
    }
    if let Some(key) = lookup(ENV_BACKEND_API_KEY).filter(|v| !v.trim().is_empty()) {
        config.backend.api_key = Some(key);
    }
    config
}
