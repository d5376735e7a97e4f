pub mod config;
pub mod events;
pub mod handlers;
pub mod manager;
pub mod observability;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use catalog_cache::{DynStore, LocalStore, RedisStore};
use catalog_db_postgres::{PostgresStorage, pool::mask_password};
use catalog_storage::DynStorage;

pub use config::{AppConfig, RedisConfig, StorageBackend, StorageConfig};
pub use events::{BroadcastChannel, DynChannel, EventChannel, Notifier, RedisChannel};
pub use manager::{CatalogError, CatalogManager, CatalogResult};
pub use observability::init_tracing;
pub use server::{AppState, CatalogServer, ServerBuilder, build_app};

/// Create the volatile store based on configuration.
///
/// ## Store Modes
///
/// - **Redis disabled**: Returns a process-local store (DashMap)
/// - **Redis enabled**: Attempts to connect to Redis, falls back to local on failure
///
/// The Redis pool, when one was established, is returned as well so the
/// event channel can share it.
pub async fn create_store(config: &RedisConfig) -> (DynStore, Option<deadpool_redis::Pool>) {
    if !config.enabled {
        tracing::info!("Redis disabled, using local store only");
        return (Arc::new(LocalStore::new()), None);
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let pool_config = redis_config
        .pool
        .get_or_insert_with(|| deadpool_redis::PoolConfig::new(config.pool_size));
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local store."
            );
            return (Arc::new(LocalStore::new()), None);
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            (Arc::new(RedisStore::new(pool.clone())), Some(pool))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local store."
            );
            (Arc::new(LocalStore::new()), None)
        }
    }
}

/// Redis pub/sub when a pool is available, in-process broadcast otherwise.
pub fn create_channel(pool: Option<deadpool_redis::Pool>) -> DynChannel {
    match pool {
        Some(pool) => Arc::new(RedisChannel::new(pool)),
        None => Arc::new(BroadcastChannel::default()),
    }
}

/// Open the configured source store.
pub async fn create_storage(config: &StorageConfig) -> anyhow::Result<DynStorage> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory source store");
            Ok(catalog_db_memory::create_memory_storage())
        }
        StorageBackend::Postgres => {
            tracing::info!(
                url = %mask_password(&config.postgres.url),
                pool_size = config.postgres.pool_size,
                "Connecting to PostgreSQL"
            );
            let storage = PostgresStorage::new(&config.postgres).await?;
            Ok(Arc::new(storage))
        }
    }
}
