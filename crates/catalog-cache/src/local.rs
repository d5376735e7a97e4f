//! Single-instance volatile store backed by a `DashMap`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::store::{KeyValueStore, ScanPage};

#[derive(Debug, Clone)]
struct LocalEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl LocalEntry {
    fn new(value: &[u8], ttl: Duration) -> Self {
        Self {
            value: value.to_vec(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process store used when Redis is disabled or unreachable.
///
/// Coordination only covers the current process, which is enough for a
/// single-instance deployment. Expired entries are dropped lazily on access.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    entries: Arc<DashMap<String, LocalEntry>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| !e.is_expired())
    }
}

pub(crate) fn pattern_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, e| e.is_expired());
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        self.entries
            .insert(key.to_string(), LocalEntry::new(value, ttl));
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &[u8], ttl: Duration) -> Result<bool, StoreError> {
        use dashmap::mapref::entry::Entry;

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(LocalEntry::new(value, ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(LocalEntry::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, StoreError> {
        let removed = keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|(_, entry)| !entry.is_expired())
            .count();
        Ok(removed as u64)
    }

    async fn delete_if_equals(&self, key: &str, value: &[u8]) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .remove_if(key, |_, e| !e.is_expired() && e.value == value)
            .is_some())
    }

    async fn scan(
        &self,
        cursor: Option<&str>,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage, StoreError> {
        // Keys are visited in lexical order and the cursor is the last key
        // returned, so deleting reported keys between batches skips nothing.
        let mut matching: Vec<String> = self
            .entries
            .iter()
            .filter(|e| !e.is_expired())
            .map(|e| e.key().clone())
            .filter(|k| pattern_matches(pattern, k))
            .filter(|k| cursor.is_none_or(|c| k.as_str() > c))
            .collect();
        matching.sort_unstable();

        let count = count.max(1);
        let next = if matching.len() > count {
            matching.truncate(count);
            matching.last().cloned()
        } else {
            None
        };
        Ok(ScanPage {
            keys: matching,
            next,
        })
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_pattern_matches() {
        assert!(pattern_matches("products:1:*", "products:1:rating"));
        assert!(!pattern_matches("products:1:*", "products:11:rating"));
        assert!(!pattern_matches("products:1:*", "products:locks:1"));
        assert!(pattern_matches("exact", "exact"));
        assert!(!pattern_matches("exact", "exact2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = LocalStore::new();
        store.set("k", b"v", Duration::from_millis(100)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));

        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_nx() {
        let store = LocalStore::new();
        assert!(store.set_nx("lock", b"a", Duration::from_secs(10)).await.unwrap());
        assert!(!store.set_nx("lock", b"b", Duration::from_secs(10)).await.unwrap());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.set_nx("lock", b"b", Duration::from_secs(10)).await.unwrap());
        assert_eq!(store.get("lock").await.unwrap(), Some(b"b".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_if_equals() {
        let store = LocalStore::new();
        store.set("lock", b"owner", MINUTE).await.unwrap();
        assert!(!store.delete_if_equals("lock", b"intruder").await.unwrap());
        assert!(store.contains_key("lock"));
        assert!(store.delete_if_equals("lock", b"owner").await.unwrap());
        assert!(!store.contains_key("lock"));
    }

    #[tokio::test]
    async fn test_scan_in_batches_while_deleting() {
        let store = LocalStore::new();
        for i in 0..7 {
            store.set(&format!("products:1:review:{i}"), b"x", MINUTE).await.unwrap();
        }
        store.set("products:2:rating", b"x", MINUTE).await.unwrap();

        let mut cursor: Option<String> = None;
        let mut batches = 0;
        let mut deleted = 0;
        loop {
            let page = store.scan(cursor.as_deref(), "products:1:*", 3).await.unwrap();
            assert!(page.keys.len() <= 3);
            deleted += store.delete(&page.keys).await.unwrap();
            batches += 1;
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(batches, 3);
        assert_eq!(deleted, 7);
        assert_eq!(store.len(), 1);
        assert!(store.contains_key("products:2:rating"));
    }
}
