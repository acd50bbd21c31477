//! Path management for Sunroof's local files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/sunroof/           # Config directory
//! └── config.toml              # Application configuration
//!
//! ~/.local/share/sunroof/      # Data directory
//! ├── pending/                 # Pending-memory slots (FileKeyValueStorage)
//! └── logs/                    # Application logs
//!     └── sunroof.log.YYYY-MM-DD
//! ```
//!
//! With a base override (tests, sandboxed platforms) the layout becomes
//! `<base>/config/` and `<base>/data/`.

use std::path::PathBuf;
use sunroof_core::error::{Result, SunroofError};

const APP_DIR: &str = "sunroof";

/// Resolves Sunroof's config, data and log locations.
#[derive(Debug, Clone, Default)]
pub struct SunroofPaths {
    base: Option<PathBuf>,
}

impl SunroofPaths {
    /// # Arguments
    ///
    /// * `base` - Root to place everything under instead of the platform
    ///   directories
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    pub fn config_dir(&self) -> Result<PathBuf> {
        match &self.base {
            Some(base) => Ok(base.join("config")),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or_else(|| SunroofError::config("Cannot determine config directory")),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.base {
            Some(base) => Ok(base.join("data")),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or_else(|| SunroofError::config("Cannot determine data directory")),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Directory holding one file per pending memory.
    pub fn pending_store_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("pending"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("logs"))
    }

    /// Creates the config, pending-store and log directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.config_dir()?, self.pending_store_dir()?, self.logs_dir()?] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}
