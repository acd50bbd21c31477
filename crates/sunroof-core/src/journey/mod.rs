//! Journey listings and their read cache.

mod cache;
mod fetcher;
mod model;

pub use cache::{CachePolicy, CachedJourneys, JourneyCache};
pub use fetcher::JourneyFetcher;
pub use model::{JourneyBucket, JourneySummary};
