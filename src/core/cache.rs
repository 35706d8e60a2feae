//! In-memory result cache with per-entry expiry.
//!
//! Callers choose per call whether to read from the cache, feed it, or both
//! through a [`CachePolicy`]. Values are cloned in and out; the store itself
//! is shared behind an `Arc<RwLock<..>>` so clones of a [`ResultCache`] see
//! the same entries.

use crate::errors::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::trace;

/// Default lifetime of a cached value (15 minutes)
pub const DEFAULT_CACHE_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// How a single call interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Return a cached value when one is available
    pub use_cache: bool,
    /// Store a freshly computed value
    pub feed_cache: bool,
    /// Lifetime of a stored value
    pub expiry: Duration,
}

impl CachePolicy {
    /// Read and feed the cache.
    #[must_use]
    pub const fn cached(expiry: Duration) -> Self {
        Self {
            use_cache: true,
            feed_cache: true,
            expiry,
        }
    }

    /// Always compute, never store.
    #[must_use]
    pub const fn bypass() -> Self {
        Self {
            use_cache: false,
            feed_cache: false,
            expiry: DEFAULT_CACHE_EXPIRY,
        }
    }

    /// Always compute, then store the result (refreshes a stale entry).
    #[must_use]
    pub const fn refresh(expiry: Duration) -> Self {
        Self {
            use_cache: false,
            feed_cache: true,
            expiry,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::bypass()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Shared key/value cache.
#[derive(Debug)]
pub struct ResultCache<V> {
    entries: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
}

impl<V> Clone for ResultCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<V: Clone> ResultCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh value stored under `key`, if any.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key` for `expiry`, dropping expired entries.
    pub async fn set(&self, key: &str, value: V, expiry: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        let purged = before - entries.len();
        if purged > 0 {
            trace!("Purged {purged} expired cache entries");
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + expiry,
            },
        );
    }

    /// Removes `key`, returning whether it was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Removes every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, expired ones included until the next `set`.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entry.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns the cached value for `key` or computes it, according to `policy`.
    ///
    /// Errors from `compute` are returned as-is and never cached.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        policy: CachePolicy,
        compute: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if !policy.use_cache && !policy.feed_cache {
            return compute().await;
        }

        if policy.use_cache {
            if let Some(value) = self.get(key).await {
                trace!("Cache hit for {key}");
                return Ok(value);
            }
            trace!("Cache miss for {key}");
        }

        let value = compute().await?;
        if policy.feed_cache {
            self.set(key, value.clone(), policy.expiry).await;
        }
        Ok(value)
    }
}
