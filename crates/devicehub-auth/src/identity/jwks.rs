//! Identity provider key set cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::error::IdentityError;

/// Unknown key ids trigger a refresh at most this often.
const MIN_FORCED_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// After a failed refresh the stale set is served without refetching for
/// this long.
const FAILED_REFRESH_BACKOFF: Duration = MIN_FORCED_REFRESH_INTERVAL;

#[derive(Debug)]
struct CachedKeySet {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
    /// Set after a failed refresh; no fetch is attempted before it.
    retry_after: Option<Instant>,
}

impl CachedKeySet {
    fn new(keys: Arc<JwkSet>) -> Self {
        Self {
            keys,
            fetched_at: Instant::now(),
            retry_after: None,
        }
    }

    fn usable_within(&self, max_age: Duration) -> bool {
        self.fetched_at.elapsed() < max_age
            || self.retry_after.is_some_and(|at| Instant::now() < at)
    }
}

/// Caches the provider's published key set and refreshes it once the TTL
/// has elapsed.
///
/// Concurrent callers that find the cache stale wait on a single refresh
/// instead of each fetching. If a refresh fails while an older key set is
/// held, the older set keeps being served and the next fetch is deferred.
#[derive(Debug)]
pub struct KeySetCache {
    client: reqwest::Client,
    url: String,
    ttl: Duration,
    current: RwLock<Option<CachedKeySet>>,
    refresh: Mutex<()>,
}

impl KeySetCache {
    /// Creates an empty cache for the key set at `url`.
    pub fn new(client: reqwest::Client, url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            ttl,
            current: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Seeds the cache with a known key set.
    pub async fn prime(&self, keys: JwkSet) {
        *self.current.write().await = Some(CachedKeySet::new(Arc::new(keys)));
    }

    /// Returns the cached key set, fetching it first if absent or older than
    /// the TTL.
    pub async fn get_or_refresh(&self) -> Result<Arc<JwkSet>, IdentityError> {
        if let Some(keys) = self.fresh_within(self.ttl).await {
            return Ok(keys);
        }

        let _refresh = self.refresh.lock().await;
        if let Some(keys) = self.fresh_within(self.ttl).await {
            return Ok(keys);
        }
        self.refresh_locked().await
    }

    /// Refetches after a token referenced a key id the cached set lacks,
    /// unless the cached set is very recent.
    pub async fn refresh_for_unknown_key(&self) -> Result<Arc<JwkSet>, IdentityError> {
        let _refresh = self.refresh.lock().await;
        if let Some(keys) = self
            .fresh_within(MIN_FORCED_REFRESH_INTERVAL.min(self.ttl))
            .await
        {
            return Ok(keys);
        }
        self.refresh_locked().await
    }

    async fn fresh_within(&self, max_age: Duration) -> Option<Arc<JwkSet>> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|cached| cached.usable_within(max_age))
            .map(|cached| Arc::clone(&cached.keys))
    }

    /// Must be called with `self.refresh` held.
    async fn refresh_locked(&self) -> Result<Arc<JwkSet>, IdentityError> {
        match self.fetch().await {
            Ok(set) => {
                let keys = Arc::new(set);
                info!(url = %self.url, keys = keys.keys.len(), "Fetched identity key set");
                *self.current.write().await = Some(CachedKeySet::new(Arc::clone(&keys)));
                Ok(keys)
            }
            Err(err) => {
                let mut current = self.current.write().await;
                match current.as_mut() {
                    Some(cached) => {
                        warn!(
                            url = %self.url,
                            error = %err,
                            age_secs = cached.fetched_at.elapsed().as_secs(),
                            retry_in_secs = FAILED_REFRESH_BACKOFF.as_secs(),
                            "Key set refresh failed, serving stale keys"
                        );
                        cached.retry_after = Some(Instant::now() + FAILED_REFRESH_BACKOFF);
                        Ok(Arc::clone(&cached.keys))
                    }
                    None => Err(err),
                }
            }
        }
    }

    async fn fetch(&self) -> Result<JwkSet, IdentityError> {
        debug!(url = %self.url, "Fetching identity key set");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IdentityError::KeySetUnavailable(e.to_string()))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| IdentityError::KeySetUnavailable(format!("invalid key set: {e}")))
    }
}
