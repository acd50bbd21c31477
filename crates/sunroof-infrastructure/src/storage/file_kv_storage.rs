use super::atomic_file::{is_temp_file_name, write_atomic};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use sunroof_core::error::{Result, SunroofError};
use sunroof_core::storage::KeyValueStorage;

const VALUE_EXTENSION: &str = "kv";

/// One file per key under a root directory.
///
/// Keys are percent-encoded into file names, so any string is a valid key.
/// Writes go through [`write_atomic`], which makes each `set` crash-safe on
/// its own.
///
/// # Directory Structure
///
/// ```text
/// <root>/
/// ├── pending_memory%3A<id>.kv
/// └── .pending_memory%3A<id>.kv.<nonce>.tmp   # only while a write is in flight
/// ```
#[derive(Debug, Clone)]
pub struct FileKeyValueStorage {
    root: PathBuf,
}

impl FileKeyValueStorage {
    /// Opens (creating if needed) the storage directory and removes temporary
    /// files left behind by an interrupted write.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let swept = sweep_temp_files(&root).await?;
        if swept > 0 {
            tracing::info!(
                "[FileKeyValueStorage] Removed {} interrupted write(s) from {}",
                swept,
                root.display()
            );
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", encode_key(key), VALUE_EXTENSION))
    }
}

#[async_trait]
impl KeyValueStorage for FileKeyValueStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let bytes = value.as_bytes().to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| SunroofError::internal(format!("Write task failed: {}", e)))?
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let suffix = format!(".{}", VALUE_EXTENSION);
        let mut keys = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if is_temp_file_name(&file_name) {
                continue;
            }
            let Some(encoded) = file_name.strip_suffix(&suffix) else {
                continue;
            };
            match decode_key(encoded) {
                Some(key) if key.starts_with(prefix) => keys.push(key),
                Some(_) => {}
                None => tracing::warn!(
                    "[FileKeyValueStorage] Ignoring file with undecodable name: {}",
                    file_name
                ),
            }
        }

        Ok(keys)
    }
}

async fn sweep_temp_files(root: &Path) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(root).await?;
    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        if is_temp_file_name(&entry.file_name().to_string_lossy()) {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn encode_key(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

fn decode_key(encoded: &str) -> Option<String> {
    urlencoding::decode(encoded).ok().map(|key| key.into_owned())
}
