//! In-memory source store for the catalog service.
//!
//! This crate provides an implementation of the `CatalogStorage` trait from
//! `catalog-storage` backed by papaya lock-free hash maps. It is used for
//! single-process deployments and as the source store in tests.
//!
//! # Example
//!
//! ```ignore
//! use catalog_db_memory::InMemoryStorage;
//! use catalog_storage::CatalogStorage;
//!
//! let storage = InMemoryStorage::new();
//! let id = storage.create_product(&new_product).await?;
//! assert_eq!(storage.average_rating(id).await?, 0.0);
//! ```

mod catalog_impl;
pub mod storage;

pub use catalog_storage::{CatalogStorage, StorageError};
pub use storage::InMemoryStorage;

/// Creates a new shareable in-memory storage instance.
pub fn create_memory_storage() -> catalog_storage::DynStorage {
    std::sync::Arc::new(InMemoryStorage::new())
}
