//! `message_id -> FileInfo` resolution through the coalescing LRU
//! (`spec.md` §4.C), plus the production upstream fetch grounded on
//! `utils.py`'s `get_fileinfo`/`get_filename`.

use async_trait::async_trait;
use gwcore::error::GatewayError;
use gwcore::file_info::FileInfo;

use crate::lru_cache::AsyncLruCache;

/// Performs the actual upstream lookup for one `(message_id, expected_name)`
/// pair. Implementations reject a message whose derived filename does not
/// match `expected_name` — the integrity check `spec.md` §6 calls load-
/// bearing against cache/ID re-use.
#[async_trait]
pub trait FileInfoSource: Send + Sync {
    /// Fetches and validates the file at `message_id`, returning `None` if
    /// the message is missing, carries no file, or its name does not match
    /// `expected_name`.
    async fn fetch(
        &self,
        message_id: i64,
        expected_name: &str,
    ) -> Result<Option<FileInfo>, GatewayError>;
}

/// Coalescing `FileInfo` resolver over one [`FileInfoSource`].
///
/// The cache key is `message_id` alone — the resolver validates `name`
/// against the fetched result rather than folding it into the key, matching
/// the source's single-route usage (`spec.md` §9 "Cache keying").
pub struct FileInfoResolver<S> {
    cache: AsyncLruCache<i64, FileInfo>,
    source: S,
}

impl<S: FileInfoSource> FileInfoResolver<S> {
    /// Builds a resolver over `source` with an LRU capacity of `cache_size`.
    #[must_use]
    pub fn new(source: S, cache_size: usize) -> Self {
        Self { cache: AsyncLruCache::new(cache_size), source }
    }

    /// Resolves `message_id`, verifying the derived filename equals `name`.
    ///
    /// Coalesces concurrent lookups for the same `message_id`; a fetch that
    /// errors, or whose filename does not match, is not cached.
    pub async fn get_file(
        &self,
        message_id: i64,
        name: &str,
    ) -> Result<Option<FileInfo>, GatewayError> {
        self.cache
            .get_or_fetch(message_id, || async { self.source.fetch(message_id, name).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        file_name: &'static str,
    }

    #[async_trait]
    impl FileInfoSource for CountingSource {
        async fn fetch(
            &self,
            message_id: i64,
            expected_name: &str,
        ) -> Result<Option<FileInfo>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if expected_name != self.file_name {
                return Ok(None);
            }
            Ok(Some(FileInfo {
                file_size: 10,
                mime_type: "application/octet-stream".into(),
                file_name: self.file_name.to_string(),
                id: message_id,
                dc_id: 2,
                location: gwcore::file_info::InputLocation::Document {
                    id: message_id,
                    access_hash: 0,
                    file_reference: vec![],
                    thumb_size: String::new(),
                },
            }))
        }
    }

    #[tokio::test]
    async fn mismatched_filename_is_not_found_and_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = FileInfoResolver::new(
            CountingSource { calls: calls.clone(), file_name: "real.bin" },
            8,
        );

        let result = resolver.get_file(100, "wrong.bin").await.unwrap();
        assert!(result.is_none());
        assert!(resolver.cache.is_empty().await);

        // A second mismatched call re-fetches; nothing was cached.
        resolver.get_file(100, "wrong.bin").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn matching_filename_is_cached_and_fetched_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = FileInfoResolver::new(
            CountingSource { calls: calls.clone(), file_name: "real.bin" },
            8,
        );

        let first = resolver.get_file(100, "real.bin").await.unwrap().unwrap();
        let second = resolver.get_file(100, "real.bin").await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
