//! # catalog-storage
//!
//! Source store abstraction for the catalog service.
//!
//! This crate only defines the [`CatalogStorage`] contract and its error
//! taxonomy; backends live in `catalog-db-memory` and `catalog-db-postgres`.

mod error;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use traits::CatalogStorage;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynStorage = std::sync::Arc<dyn CatalogStorage>;
