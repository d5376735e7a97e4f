//! Error types for the volatile store, the cache adapter and the lock.

use catalog_core::ProductId;

/// Transport-level failure talking to the volatile store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("volatile store connection error: {0}")]
    Connection(String),

    #[error("volatile store command error: {0}")]
    Command(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            Self::Connection(err.to_string())
        } else {
            Self::Command(err.to_string())
        }
    }
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Outcome of a cache read other than a hit.
///
/// `NotFound` is a regular miss and the signal callers branch on to fall
/// back to the source store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache entry not found")]
    NotFound,

    #[error(transparent)]
    Transport(#[from] StoreError),

    #[error("cache entry could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Failure to acquire or release a product lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Every attempt found the lock held by someone else.
    #[error("lock for product {product_id} is held elsewhere")]
    Locked { product_id: ProductId },

    /// The caller's cancellation token fired while waiting.
    #[error("lock acquisition cancelled")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] StoreError),
}

impl LockError {
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}
