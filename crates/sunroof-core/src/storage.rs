//! Durable key-value storage contract.

use crate::error::Result;
use async_trait::async_trait;

/// String key-value storage that survives process restart.
///
/// Each `set` must be atomic for its key: after a crash the key holds either
/// the previous value or the new one, never a partial write.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// All keys starting with `prefix`, in no particular order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}
