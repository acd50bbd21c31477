use super::model::{JourneyBucket, JourneySummary};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Freshness windows. `stale_time < cache_time` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    stale_time: Duration,
    cache_time: Duration,
}

impl CachePolicy {
    pub const DEFAULT_STALE_SECS: i64 = 30;
    pub const DEFAULT_CACHE_SECS: i64 = 5 * 60;

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stale_time: Duration::seconds(config.stale_time_secs as i64),
            cache_time: Duration::seconds(config.cache_time_secs as i64),
        })
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    pub fn cache_time(&self) -> Duration {
        self.cache_time
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_time: Duration::seconds(Self::DEFAULT_STALE_SECS),
            cache_time: Duration::seconds(Self::DEFAULT_CACHE_SECS),
        }
    }
}

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedJourneys {
    /// `None` when nothing was cached or the entry outlived `cache_time`.
    pub data: Option<Vec<JourneySummary>>,
    pub is_fresh: bool,
    pub is_stale: bool,
}

impl CachedJourneys {
    fn absent() -> Self {
        Self {
            data: None,
            is_fresh: false,
            is_stale: false,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<JourneySummary>,
    fetched_at: DateTime<Utc>,
}

/// Process-wide, memory-only cache of journey listings, scoped per user and
/// per bucket.
///
/// Construct one per application and share it; nothing here is persisted.
pub struct JourneyCache {
    entries: RwLock<HashMap<(String, JourneyBucket), CacheEntry>>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl JourneyCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn get_cached_active_journeys(&self, user_id: &str) -> CachedJourneys {
        self.get(user_id, JourneyBucket::Active)
    }

    pub fn get_cached_past_journeys(&self, user_id: &str) -> CachedJourneys {
        self.get(user_id, JourneyBucket::Past)
    }

    pub fn set_cached_active_journeys(&self, user_id: &str, data: Vec<JourneySummary>) {
        self.set(user_id, JourneyBucket::Active, data);
    }

    pub fn set_cached_past_journeys(&self, user_id: &str, data: Vec<JourneySummary>) {
        self.set(user_id, JourneyBucket::Past, data);
    }

    /// Reads one bucket. Pure: never evicts.
    pub fn get(&self, user_id: &str, bucket: JourneyBucket) -> CachedJourneys {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = entries.get(&(user_id.to_string(), bucket)) else {
            return CachedJourneys::absent();
        };

        let age = self.age_of(entry);
        if age >= self.policy.cache_time {
            return CachedJourneys::absent();
        }

        let is_fresh = age < self.policy.stale_time;
        CachedJourneys {
            data: Some(entry.data.clone()),
            is_fresh,
            is_stale: !is_fresh,
        }
    }

    /// Overwrites one bucket and stamps it with the current time.
    pub fn set(&self, user_id: &str, bucket: JourneyBucket, data: Vec<JourneySummary>) {
        let fetched_at = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        tracing::debug!(
            "[JourneyCache] Cached {} {} journeys for user {}",
            data.len(),
            bucket,
            user_id
        );
        entries.insert((user_id.to_string(), bucket), CacheEntry { data, fetched_at });
    }

    /// Clears both buckets for `user_id`.
    pub fn invalidate_journey_cache(&self, user_id: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(&(user_id.to_string(), JourneyBucket::Active));
        entries.remove(&(user_id.to_string(), JourneyBucket::Past));
        tracing::debug!("[JourneyCache] Invalidated journeys for user {}", user_id);
    }

    /// Latest `fetched_at` across both buckets, or `None` if neither is populated.
    pub fn get_last_fetch_time(&self, user_id: &str) -> Option<DateTime<Utc>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        [JourneyBucket::Active, JourneyBucket::Past]
            .iter()
            .filter_map(|bucket| entries.get(&(user_id.to_string(), *bucket)))
            .map(|entry| entry.fetched_at)
            .max()
    }

    /// Drops every user's entries (sign-out).
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    /// Evicts entries older than `cache_time`; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let cache_time = self.policy.cache_time;
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| non_negative(now - entry.fetched_at) < cache_time);
        before - entries.len()
    }

    fn age_of(&self, entry: &CacheEntry) -> Duration {
        non_negative(self.clock.now() - entry.fetched_at)
    }
}

impl Default for JourneyCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

// A wall clock stepping backwards must not make an entry look older.
fn non_negative(age: Duration) -> Duration {
    if age < Duration::zero() {
        Duration::zero()
    } else {
        age
    }
}
