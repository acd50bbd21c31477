use async_trait::async_trait;
use std::path::PathBuf;
use sunroof_core::error::{Result, SunroofError};
use sunroof_core::memory::MediaReader;

/// Reads captured media from the local filesystem.
///
/// Accepts plain paths and `file://` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMediaReader;

impl FsMediaReader {
    pub fn new() -> Self {
        Self
    }

    fn resolve(local_uri: &str) -> PathBuf {
        PathBuf::from(local_uri.strip_prefix("file://").unwrap_or(local_uri))
    }
}

#[async_trait]
impl MediaReader for FsMediaReader {
    async fn read(&self, local_uri: &str) -> Result<Vec<u8>> {
        tokio::fs::read(Self::resolve(local_uri))
            .await
            .map_err(|e| SunroofError::upload(format!("Cannot read media {}: {}", local_uri, e)))
    }
}
