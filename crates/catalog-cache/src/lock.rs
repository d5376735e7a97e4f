//! Per-product distributed lock over the volatile store.
//!
//! The lock is a key created with `SET NX PX` holding a random token.
//! Release deletes the key only while it still holds that token, so a holder
//! whose lock already expired cannot release its successor's lock.

use std::time::Duration;

use catalog_core::ProductId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::LockError;
use crate::keys;
use crate::store::DynStore;

/// Tunables for lock acquisition.
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// Expiry of a held lock. Must exceed the worst-case cache fill.
    pub ttl: Duration,
    /// Total number of `SET NX` attempts before giving up with `Locked`.
    pub max_attempts: u32,
    /// After failed attempt `n` the next one waits `n * retry_unit`.
    pub retry_unit: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10),
            max_attempts: 5,
            retry_unit: Duration::from_secs(1),
        }
    }
}

/// Mutual exclusion keyed by product identity.
#[derive(Clone)]
pub struct DistributedLock {
    store: DynStore,
    options: LockOptions,
}

impl DistributedLock {
    pub fn new(store: DynStore, options: LockOptions) -> Self {
        Self { store, options }
    }

    /// Acquires the product's lock.
    ///
    /// # Errors
    ///
    /// - `LockError::Locked` once every attempt found the lock taken.
    /// - `LockError::Cancelled` as soon as `cancel` fires.
    /// - `LockError::Transport` if the store is unreachable; no retry is made.
    pub async fn acquire(
        &self,
        product_id: ProductId,
        cancel: &CancellationToken,
    ) -> Result<LockGuard, LockError> {
        let key = keys::product_lock(product_id);
        let token = Uuid::new_v4().to_string();
        let max_attempts = self.options.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(LockError::Cancelled);
            }

            if self
                .store
                .set_nx(&key, token.as_bytes(), self.options.ttl)
                .await?
            {
                debug!(key = %key, attempt, "lock acquired");
                return Ok(LockGuard {
                    store: self.store.clone(),
                    key,
                    token,
                    released: false,
                });
            }

            if attempt == max_attempts {
                break;
            }

            let wait = self.options.retry_unit * attempt;
            debug!(key = %key, attempt, wait_ms = wait.as_millis() as u64, "lock busy, retrying");
            tokio::select! {
                _ = cancel.cancelled() => return Err(LockError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }

        debug!(key = %key, attempts = max_attempts, "lock still held, giving up");
        Err(LockError::Locked { product_id })
    }
}

/// A held product lock.
///
/// Call [`release`](Self::release) on every exit path. A guard dropped
/// without it schedules a background release on the current runtime, and
/// the lock's TTL covers the case where no runtime is available.
#[must_use = "a lock guard should be released explicitly"]
pub struct LockGuard {
    store: DynStore,
    key: String,
    token: String,
    released: bool,
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("released", &self.released)
            .finish()
    }
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Releases the lock if this guard still owns it.
    pub async fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        let removed = self
            .store
            .delete_if_equals(&self.key, self.token.as_bytes())
            .await?;
        if removed {
            debug!(key = %self.key, "lock released");
        } else {
            debug!(key = %self.key, "lock expired before release");
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let store = self.store.clone();
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        handle.spawn(async move {
            if let Err(e) = store.delete_if_equals(&key, token.as_bytes()).await {
                warn!(key = %key, error = %e, "Failed to release dropped lock");
            }
        });
    }
}
