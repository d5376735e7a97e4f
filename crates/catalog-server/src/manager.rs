//! Cache consistency manager: the outward read/write surface of the catalog.
//!
//! Reads of derived or list values go through the cache. On a miss the
//! product's distributed lock is taken, the cache is checked again, and only
//! then is the source store queried and the result cached. Writes commit to
//! the source store, invalidate every cache entry of the affected product and
//! finally publish a change event, strictly in that order.

use std::future::Future;

use catalog_cache::{CacheError, DistributedLock, LockError, ProductCache, keys};
use catalog_core::{
    CatalogAction, CatalogEvent, NewProduct, Page, ProductId, ProductWithRating, Review, ReviewId,
    ReviewInput,
};
use catalog_storage::{DynStorage, StorageError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::Notifier;

/// Errors surfaced to callers of [`CatalogManager`].
///
/// Cache, lock and notification trouble never shows up here; it only costs
/// latency or freshness.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("request cancelled while waiting for the product lock")]
    Cancelled,
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Clone)]
pub struct CatalogManager {
    storage: DynStorage,
    cache: ProductCache,
    lock: DistributedLock,
    notifier: Notifier,
}

impl CatalogManager {
    pub fn new(
        storage: DynStorage,
        cache: ProductCache,
        lock: DistributedLock,
        notifier: Notifier,
    ) -> Self {
        Self {
            storage,
            cache,
            lock,
            notifier,
        }
    }

    // ==================== Reads ====================

    /// Product with its average rating, `None` when the product does not exist.
    pub async fn get_product(
        &self,
        id: ProductId,
        cancel: &CancellationToken,
    ) -> CatalogResult<Option<ProductWithRating>> {
        let Some(product) = self.storage.get_product(id).await? else {
            return Ok(None);
        };
        let rating = self.product_rating(id, cancel).await?;
        Ok(Some(ProductWithRating::new(product, rating)))
    }

    pub async fn list_products(
        &self,
        page: Page,
        cancel: &CancellationToken,
    ) -> CatalogResult<Vec<ProductWithRating>> {
        let products = self.storage.list_products(page).await?;
        let mut result = Vec::with_capacity(products.len());
        for product in products {
            let rating = self.product_rating(product.id, cancel).await?;
            result.push(ProductWithRating::new(product, rating));
        }
        Ok(result)
    }

    /// Single review; absence is cached as well.
    pub async fn get_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
        cancel: &CancellationToken,
    ) -> CatalogResult<Option<Review>> {
        let key = keys::review(product_id, review_id);
        self.read_through(product_id, &key, cancel, || {
            self.storage.get_review(product_id, review_id)
        })
        .await
    }

    pub async fn list_reviews(
        &self,
        product_id: ProductId,
        page: Page,
        cancel: &CancellationToken,
    ) -> CatalogResult<Vec<Review>> {
        let key = keys::review_list(product_id, page);
        self.read_through(product_id, &key, cancel, || {
            self.storage.list_reviews(product_id, page)
        })
        .await
    }

    async fn product_rating(&self, id: ProductId, cancel: &CancellationToken) -> CatalogResult<f32> {
        let key = keys::rating(id);
        self.read_through(id, &key, cancel, || self.storage.average_rating(id))
            .await
    }

    /// Cache lookup with a lock-guarded, double-checked fill on miss.
    async fn read_through<T, F, Fut>(
        &self,
        product_id: ProductId,
        key: &str,
        cancel: &CancellationToken,
        load: F,
    ) -> CatalogResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        if let Some(value) = self.cached(key).await {
            return Ok(value);
        }

        let guard = match self.lock.acquire(product_id, cancel).await {
            Ok(guard) => guard,
            Err(LockError::Cancelled) => return Err(CatalogError::Cancelled),
            Err(LockError::Locked { .. }) => {
                debug!(key = %key, "product lock busy, serving uncached read");
                return Ok(load().await?);
            }
            Err(LockError::Transport(e)) => {
                warn!(key = %key, error = %e, "product lock unavailable, serving uncached read");
                return Ok(load().await?);
            }
        };

        let result = self.fill(key, load).await;

        if let Err(e) = guard.release().await {
            warn!(key = %key, error = %e, "Failed to release product lock");
        }
        result
    }

    async fn fill<T, F, Fut>(&self, key: &str, load: F) -> CatalogResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        // Another holder may have filled the entry while we were waiting.
        if let Some(value) = self.cached(key).await {
            return Ok(value);
        }
        let value = load().await?;
        self.cache.set(key, &value).await;
        Ok(value)
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(value) => Some(value),
            Err(CacheError::NotFound) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    // ==================== Writes ====================

    pub async fn create_product(&self, product: &NewProduct) -> CatalogResult<ProductId> {
        let id = self.storage.create_product(product).await?;
        self.after_write(CatalogEvent::product(id, CatalogAction::Create))
            .await;
        Ok(id)
    }

    pub async fn update_product(&self, id: ProductId, product: &NewProduct) -> CatalogResult<()> {
        self.storage.update_product(id, product).await?;
        self.after_write(CatalogEvent::product(id, CatalogAction::Update))
            .await;
        Ok(())
    }

    /// Deletes the product together with its reviews.
    pub async fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        self.storage.delete_product(id).await?;
        self.after_write(CatalogEvent::product(id, CatalogAction::Delete))
            .await;
        Ok(())
    }

    pub async fn create_review(
        &self,
        product_id: ProductId,
        review: &ReviewInput,
    ) -> CatalogResult<ReviewId> {
        let review_id = self.storage.create_review(product_id, review).await?;
        self.after_write(CatalogEvent::review(
            product_id,
            review_id,
            CatalogAction::Create,
        ))
        .await;
        Ok(review_id)
    }

    pub async fn update_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
        review: &ReviewInput,
    ) -> CatalogResult<()> {
        self.storage
            .update_review(product_id, review_id, review)
            .await?;
        self.after_write(CatalogEvent::review(
            product_id,
            review_id,
            CatalogAction::Update,
        ))
        .await;
        Ok(())
    }

    pub async fn delete_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
    ) -> CatalogResult<()> {
        self.storage.delete_review(product_id, review_id).await?;
        self.after_write(CatalogEvent::review(
            product_id,
            review_id,
            CatalogAction::Delete,
        ))
        .await;
        Ok(())
    }

    /// Runs after a committed write: invalidate, then notify.
    async fn after_write(&self, event: CatalogEvent) {
        self.cache.invalidate_product(event.product_id).await;
        self.notifier.notify(event).await;
    }
}
