//! Generic coalescing async LRU, independent of what it caches.
//!
//! Mirrors `utils.py`'s `AsyncLRUCache`: a bounded, order-aware map from key
//! to a single shared pending-or-resolved future. `tokio::sync::OnceCell`
//! supplies the coalescing (`get_or_try_init` runs the initializer exactly
//! once even under concurrent callers, and leaves the cell empty on error so
//! the next caller retries).

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::{Mutex, OnceCell};

/// Bounded, order-aware cache of `K -> V` whose population is coalesced:
/// concurrent first-time callers for the same key share one fetch.
pub struct AsyncLruCache<K, V> {
    entries: Mutex<LruCache<K, Arc<OnceCell<V>>>>,
}

impl<K, V> AsyncLruCache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Builds an empty cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).expect("cache capacity must be non-zero");
        Self { entries: Mutex::new(LruCache::new(capacity)) }
    }

    /// Returns the cached value for `key`, moving it to the most-recently
    /// used position, or runs `fetch` to populate it.
    ///
    /// If `fetch` resolves to `None` or returns an error, the key is left
    /// (or removed, if already present) absent from the cache so the next
    /// caller retries the fetch. Concurrent callers racing on the same
    /// absent key share the same `fetch` invocation — only the first one's
    /// closure actually runs.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Option<V>, E>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            if let Some(cell) = entries.get(&key) {
                cell.clone()
            } else {
                let cell = Arc::new(OnceCell::new());
                entries.put(key.clone(), cell.clone());
                cell
            }
        };

        // `fetch` returns `Result<Option<V>, E>`; the cell holds `V` once
        // resolved, so "not found" and "error" both need to fall back to
        // removing the entry rather than populating the cell.
        let mut outcome: Option<Result<Option<V>, E>> = None;
        let init = async {
            match fetch().await {
                Ok(Some(value)) => Ok(value),
                Ok(None) => {
                    outcome = Some(Ok(None));
                    Err(())
                }
                Err(err) => {
                    outcome = Some(Err(err));
                    Err(())
                }
            }
        };

        let init_result = cell.get_or_try_init(|| init).await;
        match init_result {
            Ok(value) => Ok(Some(value.clone())),
            Err(()) => {
                self.entries.lock().await.pop(&key);
                outcome.expect("outcome set before returning Err(())")
            }
        }
    }

    /// Current number of live entries (completed or pending).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache currently holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_callers_coalesce_to_one_fetch() {
        let cache: AsyncLruCache<i64, &'static str> = AsyncLruCache::new(8);
        let calls = Arc::new(AtomicUsize::new(0));

        let results = futures::future::join_all((0..8).map(|_| {
            let calls = calls.clone();
            let cache = &cache;
            async move {
                cache
                    .get_or_fetch(1, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, ()>(Some("value"))
                    })
                    .await
            }
        }))
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.into_iter().all(|r| r == Ok(Some("value"))));
    }

    #[tokio::test]
    async fn overflow_evicts_least_recently_used() {
        let cache: AsyncLruCache<i32, i32> = AsyncLruCache::new(2);
        for k in [1, 2, 3] {
            cache.get_or_fetch(k, || async move { Ok::<_, ()>(Some(k)) }).await.unwrap();
        }
        assert_eq!(cache.len().await, 2);
        // key 1 was evicted; re-fetching it should run the closure again.
        let refetched = AtomicUsize::new(0);
        cache
            .get_or_fetch(1, || async {
                refetched.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(Some(99))
            })
            .await
            .unwrap();
        assert_eq!(refetched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_no_entry() {
        let cache: AsyncLruCache<i32, i32> = AsyncLruCache::new(8);
        let result = cache.get_or_fetch(5, || async { Err::<Option<i32>, _>("boom") }).await;
        assert_eq!(result, Err("boom"));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn not_found_leaves_no_entry() {
        let cache: AsyncLruCache<i32, i32> = AsyncLruCache::new(8);
        let result = cache.get_or_fetch(5, || async { Ok::<Option<i32>, ()>(None) }).await;
        assert_eq!(result, Ok(None));
        assert!(cache.is_empty().await);
    }
}
