//! Cache store adapter: typed, best-effort access to cached catalog values.

use std::time::Duration;

use catalog_core::ProductId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::keys;
use crate::store::DynStore;

/// Tunables for cached entries.
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    /// TTL applied by [`ProductCache::set`].
    pub ttl: Duration,
    /// Keys requested per `SCAN` batch during prefix invalidation.
    pub scan_batch_size: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            scan_batch_size: 100,
        }
    }
}

/// JSON-encoded cache over a [`KeyValueStore`](crate::KeyValueStore).
///
/// Only reads report failures. Writes and invalidations log and swallow
/// them, since a cache entry's absence never changes correctness.
#[derive(Clone)]
pub struct ProductCache {
    store: DynStore,
    options: CacheOptions,
}

impl ProductCache {
    pub fn new(store: DynStore, options: CacheOptions) -> Self {
        Self { store, options }
    }

    /// Reads and decodes a cached value.
    ///
    /// A miss is reported as [`CacheError::NotFound`], distinct from
    /// transport and decoding failures.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, CacheError> {
        match self.store.get(key).await? {
            Some(bytes) => {
                debug!(key = %key, "cache hit");
                Ok(serde_json::from_slice(&bytes)?)
            }
            None => {
                debug!(key = %key, "cache miss");
                Err(CacheError::NotFound)
            }
        }
    }

    /// Stores a value with the default TTL.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.options.ttl).await;
    }

    pub async fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        match self.store.set(key, &bytes, ttl).await {
            Ok(()) => debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set"),
            Err(e) => warn!(key = %key, error = %e, "Cache SET failed"),
        }
    }

    /// Deletes every key starting with `prefix`.
    ///
    /// The keyspace is walked in bounded `SCAN` batches and each batch is
    /// deleted before the next is requested. A failure abandons the walk;
    /// whatever remains expires through its TTL.
    pub async fn delete_by_prefix(&self, prefix: &str) {
        let pattern = format!("{prefix}*");
        let mut cursor: Option<String> = None;
        let mut deleted = 0u64;

        loop {
            let page = match self
                .store
                .scan(cursor.as_deref(), &pattern, self.options.scan_batch_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(prefix = %prefix, deleted, error = %e, "Cache SCAN failed, invalidation abandoned");
                    return;
                }
            };

            if !page.keys.is_empty() {
                match self.store.delete(&page.keys).await {
                    Ok(n) => deleted += n,
                    Err(e) => {
                        warn!(prefix = %prefix, deleted, error = %e, "Cache DEL failed, invalidation abandoned");
                        return;
                    }
                }
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(prefix = %prefix, deleted, "cache prefix invalidated");
    }

    /// Drops every cached artifact of the product.
    pub async fn invalidate_product(&self, product_id: ProductId) {
        self.delete_by_prefix(&keys::product_prefix(product_id)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use catalog_core::{Page, ReviewId};

    use super::*;
    use crate::error::StoreError;
    use crate::local::LocalStore;
    use crate::store::{KeyValueStore, ScanPage};

    fn cache(store: DynStore) -> ProductCache {
        ProductCache::new(
            store,
            CacheOptions {
                scan_batch_size: 2,
                ..CacheOptions::default()
            },
        )
    }

    /// Delegates to a local store but fails `SCAN` after a number of batches.
    struct FlakyScanStore {
        inner: LocalStore,
        scans_before_failure: usize,
        scans: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for FlakyScanStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
            self.inner.set(key, value, ttl).await
        }
        async fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, StoreError> {
            self.inner.set_nx(key, value, ttl).await
        }
        async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
            self.inner.delete(keys).await
        }
        async fn delete_if_equals(&self, key: &str, value: &[u8]) -> Result<bool, StoreError> {
            self.inner.delete_if_equals(key, value).await
        }
        async fn scan(
            &self,
            cursor: Option<&str>,
            pattern: &str,
            count: usize,
        ) -> Result<ScanPage, StoreError> {
            if self.scans.fetch_add(1, Ordering::SeqCst) >= self.scans_before_failure {
                return Err(StoreError::Connection("connection reset".into()));
            }
            self.inner.scan(cursor, pattern, count).await
        }
        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_miss_is_not_found() {
        let cache = cache(Arc::new(LocalStore::new()));
        let err = cache.get::<f32>("products:1:rating").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = cache(Arc::new(LocalStore::new()));
        cache.set("products:1:rating", &4.5f32).await;
        assert_eq!(cache.get::<f32>("products:1:rating").await.unwrap(), 4.5);

        cache.set("products:1:review:9", &Option::<String>::None).await;
        let cached: Option<String> = cache.get("products:1:review:9").await.unwrap();
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_codec_error() {
        let store = Arc::new(LocalStore::new());
        store.set("k", b"not json", Duration::from_secs(60)).await.unwrap();
        let err = cache(store).get::<f32>("k").await.unwrap_err();
        assert!(matches!(err, CacheError::Codec(_)));
    }

    #[tokio::test]
    async fn test_invalidate_product_removes_all_families() {
        let store = Arc::new(LocalStore::new());
        let cache = cache(store.clone());
        let p1 = ProductId::new(1).unwrap();
        let p2 = ProductId::new(2).unwrap();

        cache.set(&keys::rating(p1), &3.0f32).await;
        for rid in 1..=3 {
            cache.set(&keys::review(p1, ReviewId::new(rid).unwrap()), &rid).await;
        }
        cache.set(&keys::review_list(p1, Page::new(0, 10)), &Vec::<i32>::new()).await;
        cache.set(&keys::review_list(p1, Page::new(10, 10)), &Vec::<i32>::new()).await;
        cache.set(&keys::rating(p2), &5.0f32).await;
        store
            .set(&keys::product_lock(p1), b"token", Duration::from_secs(10))
            .await
            .unwrap();

        cache.invalidate_product(p1).await;

        assert!(cache.get::<f32>(&keys::rating(p1)).await.unwrap_err().is_not_found());
        assert!(!store.contains_key(&keys::review_list(p1, Page::new(10, 10))));
        assert_eq!(cache.get::<f32>(&keys::rating(p2)).await.unwrap(), 5.0);
        assert!(store.contains_key(&keys::product_lock(p1)));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_scan_failure_abandons_invalidation() {
        let store = Arc::new(FlakyScanStore {
            inner: LocalStore::new(),
            scans_before_failure: 1,
            scans: AtomicUsize::new(0),
        });
        let cache = cache(store.clone());
        let p1 = ProductId::new(1).unwrap();
        for rid in 1..=5 {
            cache.set(&keys::review(p1, ReviewId::new(rid).unwrap()), &rid).await;
        }

        cache.invalidate_product(p1).await;

        // The first batch of two went away before the second SCAN failed.
        assert_eq!(store.inner.len(), 3);
        assert_eq!(store.scans.load(Ordering::SeqCst), 2);
    }
}
