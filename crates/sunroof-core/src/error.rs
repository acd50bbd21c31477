//! Error types for the Sunroof sync subsystem.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every Sunroof crate.
///
/// The four variants callers branch on are `Validation`, `Storage`, `Upload`
/// and `NotInitialized`; the rest carry lower-level failures that get folded
/// into one of those at the component boundary.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SunroofError {
    /// Malformed capture input (missing field required for the memory type).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Durable storage read/write failure.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Failure somewhere in the remote upload/create sequence.
    #[error("Upload error: {0}")]
    Upload(String),

    /// The pending-memory store was used before `initialize()` completed.
    #[error("Pending-memory store used before initialize()")]
    NotInitialized,

    /// A stored record or config file could not be (de)serialized.
    #[error("Could not parse {format}: {detail}")]
    Serialization { format: String, detail: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Connectivity or HTTP transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// A broken invariant inside this workspace, e.g. a panicked task.
    #[error("Internal failure: {0}")]
    Internal(String),
}

impl SunroofError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage { message: message.into() }
    }

    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload(message.into())
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    pub fn serialization(format: &str, detail: impl ToString) -> Self {
        Self::Serialization {
            format: format.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, Self::Upload(_))
    }

    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }

    /// Whether retrying the same operation later could succeed.
    ///
    /// Upload and network failures are transient; validation and
    /// initialisation errors are programmer or input errors and will fail
    /// the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upload(_) | Self::Network(_) | Self::Storage { .. })
    }
}

impl From<std::io::Error> for SunroofError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(format!("{err} ({:?})", err.kind()))
    }
}

impl From<serde_json::Error> for SunroofError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("JSON", err)
    }
}

impl From<toml::de::Error> for SunroofError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization("TOML", err)
    }
}

impl From<toml::ser::Error> for SunroofError {
    fn from(err: toml::ser::Error) -> Self {
        Self::serialization("TOML", err)
    }
}

/// A type alias for `Result<T, SunroofError>`.
pub type Result<T> = std::result::Result<T, SunroofError>;
