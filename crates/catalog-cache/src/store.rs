//! The volatile key/value store seam shared by the cache adapter and the lock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// One batch of a cursor-based key scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub keys: Vec<String>,
    /// Cursor for the next batch, `None` once the keyspace is exhausted.
    pub next: Option<String>,
}

/// Best-effort, TTL-capable key/value store reachable by every service
/// instance.
///
/// Patterns accepted by [`scan`](Self::scan) are either an exact key or a
/// prefix followed by a single trailing `*`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored bytes, `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    /// Atomically stores the value only if the key is absent.
    ///
    /// Returns `true` when this call created the key.
    async fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, StoreError>;

    /// Deletes the given keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// Deletes the key only if it currently holds `value`.
    async fn delete_if_equals(&self, key: &str, value: &[u8]) -> Result<bool, StoreError>;

    /// Returns one bounded batch of keys matching `pattern`.
    ///
    /// A scan starts with `cursor = None` and continues with the returned
    /// [`ScanPage::next`] until it is `None`. Keys created or removed while a
    /// scan is in progress may or may not be reported.
    async fn scan(
        &self,
        cursor: Option<&str>,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError>;

    fn backend_name(&self) -> &'static str;
}

pub type DynStore = Arc<dyn KeyValueStore>;
