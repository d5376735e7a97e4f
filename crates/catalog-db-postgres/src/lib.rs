//! PostgreSQL source store for the catalog service.
//!
//! Implements `CatalogStorage` over a `sqlx` connection pool. The crate uses
//! `sqlx-core` and `sqlx-postgres` directly rather than the `sqlx` facade.

pub mod config;
pub mod error;
pub mod pool;
mod storage;

pub use config::PostgresConfig;
pub use error::PostgresError;
pub use pool::create_pool;
pub use storage::PostgresStorage;
