//! Per-record upload pipeline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sunroof_core::error::{Result, SunroofError};
use sunroof_core::memory::{
    MediaReader, MemoryDatabase, MemoryKind, MemoryRecord, NewMemoryRecord, ObjectStorage,
    PendingMemory,
};
use tokio::time::Instant;

/// Uploads one pending memory to the backend.
///
/// Media kinds: read local bytes, upload them to object storage, resolve the
/// public URL, create the memory row. Text kinds only create the row.
pub struct MemoryUploader {
    media: Arc<dyn MediaReader>,
    object_storage: Arc<dyn ObjectStorage>,
    database: Arc<dyn MemoryDatabase>,
    timeout: Duration,
}

impl MemoryUploader {
    pub fn new(
        media: Arc<dyn MediaReader>,
        object_storage: Arc<dyn ObjectStorage>,
        database: Arc<dyn MemoryDatabase>,
        timeout: Duration,
    ) -> Self {
        Self {
            media,
            object_storage,
            database,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the whole pipeline for `memory` under the configured timeout.
    ///
    /// The deadline is shared by every stage. When it passes while the
    /// record is being created, the already uploaded object is still removed.
    ///
    /// # Errors
    ///
    /// Every failure, including the timeout, comes back as
    /// `SunroofError::Upload` with the stage that failed.
    pub async fn upload(&self, memory: &PendingMemory) -> Result<MemoryRecord> {
        let deadline = Instant::now() + self.timeout;

        let Some(local_uri) = memory.content.local_uri() else {
            let record = NewMemoryRecord::from_pending(memory, None);
            return self
                .stage(deadline, "create record", self.database.create_memory_record(record))
                .await;
        };

        let bytes = self
            .stage(deadline, "read media", self.media.read(local_uri))
            .await?;

        let path = object_path(memory);
        let content_type = content_type_for(local_uri, memory.kind());
        tracing::debug!(
            id = %memory.id,
            path = %path,
            content_type,
            size = bytes.len(),
            "[MemoryUploader] Uploading media"
        );
        self.stage(
            deadline,
            "upload media",
            self.object_storage.upload(&path, bytes, content_type),
        )
        .await?;

        let record = NewMemoryRecord::from_pending(memory, Some(self.object_storage.public_url(&path)));
        let created = self
            .stage(deadline, "create record", self.database.create_memory_record(record))
            .await;
        if created.is_err() {
            self.remove_orphan(memory, &path).await;
        }
        created
    }

    async fn stage<T>(
        &self,
        deadline: Instant,
        name: &str,
        work: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout_at(deadline, work).await {
            Ok(result) => result.map_err(|e| stage_error(name, e)),
            Err(_) => Err(SunroofError::upload(format!(
                "{}: timed out after {}s",
                name,
                self.timeout.as_secs_f64()
            ))),
        }
    }

    async fn remove_orphan(&self, memory: &PendingMemory, path: &str) {
        let outcome = tokio::time::timeout(self.timeout, self.object_storage.remove(path)).await;
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "timed out".to_string(),
        };
        tracing::warn!(
            id = %memory.id,
            path = %path,
            "[MemoryUploader] Failed to remove orphaned object: {}",
            failure
        );
    }
}

/// Remote object path: `{user_id}/{journey_id}/{memory_id}.{ext}`.
///
/// The extension comes from the local file when it has one.
pub fn object_path(memory: &PendingMemory) -> String {
    let extension = memory
        .content
        .local_uri()
        .and_then(|uri| Path::new(uri).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| memory.kind().default_extension().to_string());

    format!(
        "{}/{}/{}.{}",
        memory.user_id, memory.journey_id, memory.id, extension
    )
}

fn content_type_for(local_uri: &str, kind: MemoryKind) -> &'static str {
    mime_guess::from_path(local_uri)
        .first_raw()
        .unwrap_or_else(|| kind.default_content_type())
}

fn stage_error(stage: &str, err: SunroofError) -> SunroofError {
    let detail = match err {
        SunroofError::Upload(message) | SunroofError::Network(message) => message,
        other => other.to_string(),
    };
    SunroofError::upload(format!("{}: {}", stage, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use sunroof_core::memory::{MemoryContent, MemoryStatus};

    #[derive(Default)]
    struct FakeMedia;

    #[async_trait]
    impl MediaReader for FakeMedia {
        async fn read(&self, local_uri: &str) -> Result<Vec<u8>> {
            if local_uri.contains("missing") {
                return Err(SunroofError::upload("no such file"));
            }
            Ok(local_uri.as_bytes().to_vec())
        }
    }

    #[derive(Default)]
    struct FakeObjectStorage {
        uploads: Mutex<Vec<(String, String)>>,
        removed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStorage for FakeObjectStorage {
        async fn upload(&self, path: &str, _bytes: Vec<u8>, content_type: &str) -> Result<()> {
            self.uploads
                .lock()
                .unwrap()
                .push((path.to_string(), content_type.to_string()));
            Ok(())
        }

        fn public_url(&self, path: &str) -> String {
            format!("https://cdn.example.test/{}", path)
        }

        async fn remove(&self, path: &str) -> Result<()> {
            self.removed.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }

    struct FakeDatabase {
        fail: bool,
        delay: Duration,
        created: Mutex<Vec<NewMemoryRecord>>,
    }

    impl FakeDatabase {
        fn new(fail: bool, delay: Duration) -> Self {
            Self {
                fail,
                delay,
                created: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MemoryDatabase for FakeDatabase {
        async fn create_memory_record(&self, record: NewMemoryRecord) -> Result<MemoryRecord> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(SunroofError::network("HTTP 500"));
            }
            self.created.lock().unwrap().push(record.clone());
            Ok(MemoryRecord {
                id: "remote-1".to_string(),
                journey_id: record.journey_id,
                media_url: record.media_url,
            })
        }
    }

    fn memory(content: MemoryContent) -> PendingMemory {
        PendingMemory {
            id: "m1".to_string(),
            journey_id: "j1".to_string(),
            user_id: "u1".to_string(),
            content,
            location: None,
            weather: None,
            tags: vec![],
            status: MemoryStatus::Uploading,
            last_error: None,
            attempts: 1,
            sequence: 0,
            created_at: Utc::now(),
        }
    }

    fn uploader(
        storage: Arc<FakeObjectStorage>,
        database: Arc<FakeDatabase>,
        timeout: Duration,
    ) -> MemoryUploader {
        MemoryUploader::new(Arc::new(FakeMedia), storage, database, timeout)
    }

    #[test]
    fn test_object_path_uses_local_extension_or_kind_default() {
        let with_ext = memory(MemoryContent::Photo {
            local_uri: "file:///dcim/IMG_0001.HEIC".into(),
            caption: None,
        });
        assert_eq!(object_path(&with_ext), "u1/j1/m1.heic");

        let without_ext = memory(MemoryContent::Audio {
            local_uri: "content://recordings/42".into(),
            duration_secs: 1.0,
            caption: None,
        });
        assert_eq!(object_path(&without_ext), "u1/j1/m1.m4a");
    }

    #[tokio::test]
    async fn test_media_upload_then_record_creation() {
        let storage = Arc::new(FakeObjectStorage::default());
        let database = Arc::new(FakeDatabase::new(false, Duration::ZERO));
        let uploader = uploader(storage.clone(), database.clone(), Duration::from_secs(5));

        let record = uploader
            .upload(&memory(MemoryContent::Photo {
                local_uri: "file:///p.png".into(),
                caption: Some("hi".into()),
            }))
            .await
            .unwrap();

        assert_eq!(
            record.media_url.as_deref(),
            Some("https://cdn.example.test/u1/j1/m1.png")
        );
        assert_eq!(
            *storage.uploads.lock().unwrap(),
            vec![("u1/j1/m1.png".to_string(), "image/png".to_string())]
        );
        let created = database.created.lock().unwrap();
        assert_eq!(created[0].note.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_text_skips_object_storage() {
        let storage = Arc::new(FakeObjectStorage::default());
        let database = Arc::new(FakeDatabase::new(false, Duration::ZERO));
        let uploader = uploader(storage.clone(), database.clone(), Duration::from_secs(5));

        let record = uploader
            .upload(&memory(MemoryContent::Text { note: "n".into() }))
            .await
            .unwrap();
        assert!(record.media_url.is_none());
        assert!(storage.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_failure_removes_uploaded_object() {
        let storage = Arc::new(FakeObjectStorage::default());
        let database = Arc::new(FakeDatabase::new(true, Duration::ZERO));
        let uploader = uploader(storage.clone(), database, Duration::from_secs(5));

        let err = uploader
            .upload(&memory(MemoryContent::Video {
                local_uri: "file:///v.mp4".into(),
                duration_secs: 2.0,
                caption: None,
            }))
            .await
            .unwrap_err();

        assert!(err.is_upload());
        assert!(err.to_string().contains("create record"));
        assert_eq!(*storage.removed.lock().unwrap(), vec!["u1/j1/m1.mp4"]);
    }

    #[tokio::test]
    async fn test_unreadable_media_fails_before_upload() {
        let storage = Arc::new(FakeObjectStorage::default());
        let database = Arc::new(FakeDatabase::new(false, Duration::ZERO));
        let uploader = uploader(storage.clone(), database, Duration::from_secs(5));

        let err = uploader
            .upload(&memory(MemoryContent::Photo {
                local_uri: "file:///missing.jpg".into(),
                caption: None,
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("read media"));
        assert!(storage.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_during_record_creation_removes_uploaded_object() {
        let storage = Arc::new(FakeObjectStorage::default());
        let database = Arc::new(FakeDatabase::new(false, Duration::from_secs(5)));
        let uploader = uploader(storage.clone(), database.clone(), Duration::from_millis(50));

        let err = uploader
            .upload(&memory(MemoryContent::Photo {
                local_uri: "file:///late.jpg".into(),
                caption: None,
            }))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("create record: timed out"));
        assert_eq!(storage.uploads.lock().unwrap().len(), 1);
        assert_eq!(*storage.removed.lock().unwrap(), vec!["u1/j1/m1.jpg"]);
        assert!(database.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_as_upload_error() {
        let storage = Arc::new(FakeObjectStorage::default());
        let database = Arc::new(FakeDatabase::new(false, Duration::from_secs(5)));
        let uploader = uploader(storage, database, Duration::from_millis(20));

        let err = uploader
            .upload(&memory(MemoryContent::Text { note: "n".into() }))
            .await
            .unwrap_err();
        assert!(err.is_upload());
        assert!(err.to_string().contains("timed out"));
    }
}
