//! REST adapters for the backend-as-a-service that stores memories.
//!
//! Media goes to the object storage API under
//! `/storage/v1/object/{bucket}/{path}`; memory rows and journey listings go
//! through the table API under `/rest/v1/`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;
use sunroof_core::config::BackendConfig;
use sunroof_core::error::{Result, SunroofError};
use sunroof_core::journey::{JourneyFetcher, JourneySummary};
use sunroof_core::memory::{MemoryDatabase, MemoryRecord, NewMemoryRecord, ObjectStorage};
use sunroof_infrastructure::{ConfigService, SunroofPaths};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
// Media bodies can be large; the uploader's own timeout still applies on top.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

const MEMORIES_TABLE: &str = "memories";
const JOURNEYS_TABLE: &str = "journeys";

/// Authenticated HTTP access to the backend.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
    api_key: String,
    bucket: String,
}

impl BackendClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, bucket: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SunroofError::config(format!("invalid backend.url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SunroofError::config(format!(
                "backend.url '{}' cannot carry a path",
                base_url
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: api_key.into(),
            bucket: bucket.into(),
        })
    }

    /// Builds a client from `[backend]`; both `url` and `api_key` must be set.
    pub fn try_from_config(config: &BackendConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| SunroofError::config("backend.url is not set"))?;
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SunroofError::config("backend.api_key is not set"))?;

        let client = Self::new(url, api_key, config.media_bucket.clone())?;
        tracing::info!(
            "[BackendClient] Initialized with URL: {}, bucket: {}, API key: present",
            client.base_url,
            client.bucket
        );
        Ok(client)
    }

    /// Loads `config.toml` from the platform config directory (with the
    /// `SUNROOF_BACKEND_*` environment overrides) and builds a client.
    pub fn try_from_env() -> Result<Self> {
        let service = ConfigService::from_paths(&SunroofPaths::default())?;
        let config = service.load()?;
        Self::try_from_config(&config.backend)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn object_storage(&self) -> RestObjectStorage {
        RestObjectStorage {
            backend: self.clone(),
        }
    }

    pub fn database(&self) -> RestMemoryDatabase {
        RestMemoryDatabase {
            backend: self.clone(),
        }
    }

    pub fn journeys(&self) -> RestJourneyFetcher {
        RestJourneyFetcher {
            backend: self.clone(),
        }
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn endpoint<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always has path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn object_url(&self, public: bool, path: &str) -> Url {
        let mut segments = vec!["storage", "v1", "object"];
        if public {
            segments.push("public");
        }
        segments.push(&self.bucket);
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(segments)
    }

    fn table_url(&self, table: &str) -> Url {
        self.endpoint(["rest", "v1", table])
    }
}

/// Media upload via the storage API.
pub struct RestObjectStorage {
    backend: BackendClient,
}

#[async_trait]
impl ObjectStorage for RestObjectStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let url = self.backend.object_url(false, path);
        let request = self.backend.auth_request(
            self.backend
                .client
                .post(url)
                .header("Content-Type", content_type)
                .header("x-upsert", "true")
                .body(bytes)
                .timeout(UPLOAD_TIMEOUT),
        );

        let response = request.send().await.map_err(|e| request_error("upload", e))?;
        ensure_success("upload", response).await?;
        tracing::debug!(path, "[RestObjectStorage] Uploaded object");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        self.backend.object_url(true, path).to_string()
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let url = self.backend.object_url(false, path);
        let request = self
            .backend
            .auth_request(self.backend.client.delete(url).timeout(REQUEST_TIMEOUT));

        let response = request.send().await.map_err(|e| request_error("remove", e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success("remove", response).await?;
        Ok(())
    }
}

/// Memory rows via the table API.
pub struct RestMemoryDatabase {
    backend: BackendClient,
}

#[async_trait]
impl MemoryDatabase for RestMemoryDatabase {
    async fn create_memory_record(&self, record: NewMemoryRecord) -> Result<MemoryRecord> {
        let url = self.backend.table_url(MEMORIES_TABLE);
        let request = self.backend.auth_request(
            self.backend
                .client
                .post(url)
                .header("Prefer", "return=representation")
                .json(&record)
                .timeout(REQUEST_TIMEOUT),
        );

        let response = request
            .send()
            .await
            .map_err(|e| request_error("create memory", e))?;
        let response = ensure_success("create memory", response).await?;
        let mut rows: Vec<MemoryRecord> = response.json().await.map_err(|e| {
            SunroofError::network(format!("create memory: unreadable response: {}", e))
        })?;

        if rows.is_empty() {
            return Err(SunroofError::upload("create memory: backend returned no row"));
        }
        Ok(rows.swap_remove(0))
    }
}

/// Journey listings via the table API.
pub struct RestJourneyFetcher {
    backend: BackendClient,
}

impl RestJourneyFetcher {
    async fn fetch(&self, user_id: &str, unlock_filter: String, order: &str) -> Result<Vec<JourneySummary>> {
        let url = self.backend.table_url(JOURNEYS_TABLE);
        let user_filter = format!("eq.{}", user_id);
        let request = self.backend.auth_request(
            self.backend
                .client
                .get(url)
                .query(&[
                    ("select", "*"),
                    ("user_id", user_filter.as_str()),
                    ("unlock_date", unlock_filter.as_str()),
                    ("order", order),
                ])
                .timeout(REQUEST_TIMEOUT),
        );

        let response = request
            .send()
            .await
            .map_err(|e| request_error("fetch journeys", e))?;
        let response = ensure_success("fetch journeys", response).await?;
        response.json().await.map_err(|e| {
            SunroofError::network(format!("fetch journeys: unreadable response: {}", e))
        })
    }
}

#[async_trait]
impl JourneyFetcher for RestJourneyFetcher {
    async fn fetch_active(&self, user_id: &str) -> Result<Vec<JourneySummary>> {
        let now = Utc::now().to_rfc3339();
        self.fetch(user_id, format!("gt.{}", now), "unlock_date.asc")
            .await
    }

    async fn fetch_past(&self, user_id: &str) -> Result<Vec<JourneySummary>> {
        let now = Utc::now().to_rfc3339();
        self.fetch(user_id, format!("lte.{}", now), "unlock_date.desc")
            .await
    }
}

/// Transport failures are always network errors.
fn request_error(operation: &str, e: reqwest::Error) -> SunroofError {
    if e.is_timeout() {
        SunroofError::network(format!("{}: request timed out", operation))
    } else {
        SunroofError::network(format!("{}: {}", operation, e))
    }
}

/// Non-2xx responses: 4xx means the backend rejected the request, anything
/// else is treated as a transient network problem.
async fn ensure_success(operation: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::warn!(
        "[BackendClient] {} failed with HTTP {}: {}",
        operation,
        status.as_u16(),
        error_text
    );

    let message = format!("{}: HTTP {}: {}", operation, status.as_u16(), error_text);
    if status.is_client_error() {
        Err(SunroofError::upload(message))
    } else {
        Err(SunroofError::network(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::TestServer;
    use sunroof_core::memory::MemoryKind;

    fn record() -> NewMemoryRecord {
        NewMemoryRecord {
            journey_id: "j1".to_string(),
            user_id: "u1".to_string(),
            kind: MemoryKind::Photo,
            media_url: Some("https://cdn/x.jpg".to_string()),
            note: Some("sunset".to_string()),
            duration: None,
            location: None,
            weather: None,
            tags: vec![],
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_try_from_config_requires_url_and_key() {
        let mut config = BackendConfig::default();
        assert!(matches!(
            BackendClient::try_from_config(&config),
            Err(SunroofError::Config(_))
        ));

        config.url = Some("https://example.test".to_string());
        assert!(BackendClient::try_from_config(&config).is_err());

        config.api_key = Some("anon-key".to_string());
        assert!(BackendClient::try_from_config(&config).is_ok());

        config.url = Some("not a url".to_string());
        assert!(BackendClient::try_from_config(&config).is_err());
    }

    #[test]
    fn test_public_url_layout() {
        let client = BackendClient::new("https://example.test/", "k", "memories").unwrap();
        assert_eq!(
            client.object_storage().public_url("u1/j1/m1.jpg"),
            "https://example.test/storage/v1/object/public/memories/u1/j1/m1.jpg"
        );
    }

    #[test]
    fn test_path_segments_are_escaped() {
        let client = BackendClient::new("https://example.test", "k", "memories").unwrap();
        let url = client.object_url(false, "user one/j?1/m#1.jpg");
        assert_eq!(
            url.as_str(),
            "https://example.test/storage/v1/object/memories/user%20one/j%3F1/m%231.jpg"
        );
    }

    #[tokio::test]
    async fn test_create_memory_record_posts_json_with_auth() {
        let server = TestServer::start(
            201,
            r#"[{"id":"r1","journey_id":"j1","media_url":"https://cdn/x.jpg"}]"#,
        )
        .await;
        let client = BackendClient::new(&server.base_url, "secret", "memories").unwrap();

        let created = client.database().create_memory_record(record()).await.unwrap();
        assert_eq!(created.id, "r1");

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/rest/v1/memories");
        assert_eq!(requests[0].header("authorization"), Some("Bearer secret"));
        assert_eq!(requests[0].header("apikey"), Some("secret"));
        assert_eq!(requests[0].json()["type"], "photo");
        assert_eq!(requests[0].json()["note"], "sunset");
    }

    #[tokio::test]
    async fn test_client_error_is_an_upload_error() {
        let server = TestServer::start(400, r#"{"message":"bad journey"}"#).await;
        let client = BackendClient::new(&server.base_url, "secret", "memories").unwrap();

        let err = client.database().create_memory_record(record()).await.unwrap_err();
        assert!(err.is_upload());
        assert!(err.to_string().contains("HTTP 400"));
    }

    #[tokio::test]
    async fn test_server_error_is_a_network_error() {
        let server = TestServer::start(503, "{}").await;
        let client = BackendClient::new(&server.base_url, "secret", "memories").unwrap();

        let err = client
            .object_storage()
            .upload("u/j/m.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, SunroofError::Network(_)));

        let requests = server.requests();
        assert_eq!(requests[0].target, "/storage/v1/object/memories/u/j/m.jpg");
        assert_eq!(requests[0].header("content-type"), Some("image/jpeg"));
        assert_eq!(requests[0].body, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_active_filters_by_user_and_unlock_date() {
        let server = TestServer::start(
            200,
            r#"[{"id":"J1","name":"Lisbon","unlock_date":"2030-01-01T00:00:00Z","memory_count":3,"cover":"x"}]"#,
        )
        .await;
        let client = BackendClient::new(&server.base_url, "secret", "memories").unwrap();

        let journeys = client.journeys().fetch_active("user-1").await.unwrap();
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].memory_count, 3);
        assert_eq!(journeys[0].extra["cover"], "x");

        let target = &server.requests()[0].target;
        assert!(target.starts_with("/rest/v1/journeys?"));
        assert!(target.contains("user_id=eq.user-1"));
        assert!(target.contains("unlock_date=gt."));
    }

    #[tokio::test]
    async fn test_remove_treats_missing_object_as_done() {
        let server = TestServer::start(404, "{}").await;
        let client = BackendClient::new(&server.base_url, "secret", "memories").unwrap();

        client.object_storage().remove("u/j/m.jpg").await.unwrap();
        assert_eq!(server.requests()[0].method, "DELETE");
    }
}
