//! Stale-while-revalidate loading of a user's journey lists.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use sunroof_core::error::Result;
use sunroof_core::journey::{JourneyCache, JourneyFetcher, JourneySummary};
use tokio::sync::watch;

/// What the journey screen renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JourneyListState {
    pub active: Option<Vec<JourneySummary>>,
    pub past: Option<Vec<JourneySummary>>,
    /// Nothing to show yet; a fetch is in flight.
    pub is_loading: bool,
    /// Showing cached data while a fetch is in flight.
    pub is_refreshing: bool,
    pub last_error: Option<String>,
}

/// How [`JourneyListLoader::load`] satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Both lists were fresh; no network call was made.
    Fresh,
    /// Cached data was published and a background fetch was started.
    ServedStale,
    /// Nothing usable was cached; fetched inline.
    Fetched,
}

struct LoaderInner {
    user_id: String,
    cache: Arc<JourneyCache>,
    fetcher: Arc<dyn JourneyFetcher>,
    state: watch::Sender<JourneyListState>,
    revalidating: AtomicBool,
}

/// Loads the active and past journey lists for one user through the shared
/// [`JourneyCache`].
#[derive(Clone)]
pub struct JourneyListLoader {
    inner: Arc<LoaderInner>,
}

impl JourneyListLoader {
    pub fn new(
        user_id: impl Into<String>,
        cache: Arc<JourneyCache>,
        fetcher: Arc<dyn JourneyFetcher>,
    ) -> Self {
        let (state, _) = watch::channel(JourneyListState::default());
        Self {
            inner: Arc::new(LoaderInner {
                user_id: user_id.into(),
                cache,
                fetcher,
                state,
                revalidating: AtomicBool::new(false),
            }),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn state(&self) -> JourneyListState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JourneyListState> {
        self.inner.state.subscribe()
    }

    /// Publishes whatever is cached, then fetches if anything is stale or
    /// missing.
    ///
    /// # Errors
    ///
    /// Only an inline fetch (nothing cached) reports its failure here. A
    /// background revalidation failure lands in `last_error`.
    pub async fn load(&self) -> Result<LoadOutcome> {
        let inner = &self.inner;
        let active = inner.cache.get_cached_active_journeys(&inner.user_id);
        let past = inner.cache.get_cached_past_journeys(&inner.user_id);

        if active.is_fresh && past.is_fresh {
            inner.state.send_modify(|s| {
                s.active = active.data;
                s.past = past.data;
                s.is_loading = false;
            });
            return Ok(LoadOutcome::Fresh);
        }

        if active.data.is_some() || past.data.is_some() {
            inner.state.send_modify(|s| {
                s.active = active.data;
                s.past = past.data;
                s.is_loading = false;
            });
            self.revalidate_in_background();
            return Ok(LoadOutcome::ServedStale);
        }

        inner.state.send_modify(|s| {
            s.active = None;
            s.past = None;
            s.is_loading = true;
        });
        let result = inner.fetch_and_store().await;
        inner.state.send_modify(|s| s.is_loading = false);
        result.map(|_| LoadOutcome::Fetched)
    }

    /// Re-fetches both lists regardless of freshness.
    pub async fn refresh(&self) -> Result<()> {
        let inner = &self.inner;
        inner.state.send_modify(|s| s.is_refreshing = true);
        let result = inner.fetch_and_store().await;
        inner.state.send_modify(|s| s.is_refreshing = false);
        result
    }

    /// Drops the cached lists so the next `load` fetches.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate_journey_cache(&self.inner.user_id);
    }

    fn revalidate_in_background(&self) {
        if self.inner.revalidating.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.state.send_modify(|s| s.is_refreshing = true);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            // Failures are already recorded in `last_error`.
            let _ = inner.fetch_and_store().await;
            inner.state.send_modify(|s| s.is_refreshing = false);
            inner.revalidating.store(false, Ordering::SeqCst);
        });
    }
}

impl LoaderInner {
    async fn fetch_and_store(&self) -> Result<()> {
        let fetched = tokio::try_join!(
            self.fetcher.fetch_active(&self.user_id),
            self.fetcher.fetch_past(&self.user_id)
        );

        match fetched {
            Ok((active, past)) => {
                self.cache.set_cached_active_journeys(&self.user_id, active.clone());
                self.cache.set_cached_past_journeys(&self.user_id, past.clone());
                self.state.send_modify(|s| {
                    s.active = Some(active);
                    s.past = Some(past);
                    s.last_error = None;
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    "[JourneyListLoader] Fetch failed: {}",
                    e
                );
                let message = e.to_string();
                self.state.send_modify(|s| s.last_error = Some(message));
                Err(e)
            }
        }
    }
}
