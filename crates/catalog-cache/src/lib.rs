//! Read-through cache building blocks for the catalog service.
//!
//! - [`KeyValueStore`]: the volatile store seam, with [`RedisStore`] for
//!   multi-instance deployments and [`LocalStore`] for a single process.
//! - [`ProductCache`]: typed get/set with TTL and prefix invalidation.
//! - [`DistributedLock`]: per-product mutual exclusion with bounded retries.
//! - [`keys`]: the key layout shared by all of the above.

mod adapter;
mod error;
pub mod keys;
mod local;
mod lock;
mod redis_store;
mod store;

pub use adapter::{CacheOptions, ProductCache};
pub use error::{CacheError, LockError, StoreError};
pub use local::LocalStore;
pub use lock::{DistributedLock, LockGuard, LockOptions};
pub use redis_store::RedisStore;
pub use store::{DynStore, KeyValueStore, ScanPage};
