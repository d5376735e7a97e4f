//! The source-of-truth store contract.

use async_trait::async_trait;
use catalog_core::{NewProduct, Page, Product, ProductId, Review, ReviewId, ReviewInput};

use crate::error::StorageError;

/// Durable, strongly consistent store for products and reviews.
///
/// Reads return `Ok(None)` for absent entities; updates and deletes of an
/// absent entity return [`StorageError::NotFound`]. Reviews are always
/// addressed together with their owning product, and a review that exists
/// under a different product is treated as absent.
#[async_trait]
pub trait CatalogStorage: Send + Sync {
    // ==================== Products ====================

    /// Persists a new product and returns its assigned identity.
    async fn create_product(&self, product: &NewProduct) -> Result<ProductId, StorageError>;

    /// Replaces the fields of an existing product.
    async fn update_product(&self, id: ProductId, product: &NewProduct)
    -> Result<(), StorageError>;

    /// Removes a product together with all of its reviews.
    async fn delete_product(&self, id: ProductId) -> Result<(), StorageError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StorageError>;

    /// Lists products ordered by identity.
    async fn list_products(&self, page: Page) -> Result<Vec<Product>, StorageError>;

    /// Average rating over the product's reviews, `0.0` when it has none.
    async fn average_rating(&self, id: ProductId) -> Result<f32, StorageError>;

    // ==================== Reviews ====================

    /// Persists a review under an existing product.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the product does not exist.
    async fn create_review(
        &self,
        product_id: ProductId,
        review: &ReviewInput,
    ) -> Result<ReviewId, StorageError>;

    async fn update_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
        review: &ReviewInput,
    ) -> Result<(), StorageError>;

    async fn delete_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
    ) -> Result<(), StorageError>;

    async fn get_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
    ) -> Result<Option<Review>, StorageError>;

    /// Lists a product's reviews ordered by identity.
    async fn list_reviews(
        &self,
        product_id: ProductId,
        page: Page,
    ) -> Result<Vec<Review>, StorageError>;

    // ==================== Metadata ====================

    /// Returns the name of this storage backend for logging.
    fn backend_name(&self) -> &'static str;
}
