use super::model::JourneySummary;
use crate::error::Result;
use async_trait::async_trait;

/// Loads journey listings from the backend.
#[async_trait]
pub trait JourneyFetcher: Send + Sync {
    /// Journeys the user can still add memories to.
    async fn fetch_active(&self, user_id: &str) -> Result<Vec<JourneySummary>>;

    /// Journeys whose capture window is closed.
    async fn fetch_past(&self, user_id: &str) -> Result<Vec<JourneySummary>>;
}
