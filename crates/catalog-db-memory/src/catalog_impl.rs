//! Implementation of the CatalogStorage trait for InMemoryStorage.

use async_trait::async_trait;
use catalog_core::{NewProduct, Page, Product, ProductId, Review, ReviewId, ReviewInput};
use catalog_storage::{CatalogStorage, StorageError};

use crate::storage::{InMemoryStorage, window};

fn product_id(raw: i64) -> Result<ProductId, StorageError> {
    ProductId::new(raw).map_err(|e| StorageError::internal(e.to_string()))
}

fn review_id(raw: i64) -> Result<ReviewId, StorageError> {
    ReviewId::new(raw).map_err(|e| StorageError::internal(e.to_string()))
}

#[async_trait]
impl CatalogStorage for InMemoryStorage {
    async fn create_product(&self, product: &NewProduct) -> Result<ProductId, StorageError> {
        let id = product_id(self.next_product_id())?;
        self.products
            .pin()
            .insert(id, product.clone().into_product(id));
        Ok(id)
    }

    async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<(), StorageError> {
        let guard = self.products.pin();
        if guard.get(&id).is_none() {
            return Err(StorageError::not_found("product", id));
        }
        guard.insert(id, product.clone().into_product(id));
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StorageError> {
        if self.products.pin().remove(&id).is_none() {
            return Err(StorageError::not_found("product", id));
        }
        self.remove_reviews_of(id);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StorageError> {
        Ok(self.products.pin().get(&id).cloned())
    }

    async fn list_products(&self, page: Page) -> Result<Vec<Product>, StorageError> {
        let mut products: Vec<Product> = self.products.pin().values().cloned().collect();
        products.sort_by_key(|p| p.id);
        Ok(window(products, page))
    }

    async fn average_rating(&self, id: ProductId) -> Result<f32, StorageError> {
        let reviews = self.reviews_of(id);
        if reviews.is_empty() {
            return Ok(0.0);
        }
        let total: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
        Ok(total as f32 / reviews.len() as f32)
    }

    async fn create_review(
        &self,
        product_id: ProductId,
        review: &ReviewInput,
    ) -> Result<ReviewId, StorageError> {
        if self.products.pin().get(&product_id).is_none() {
            return Err(StorageError::not_found("product", product_id));
        }
        let id = review_id(self.next_review_id())?;
        let reviews = self.reviews.pin();
        reviews.insert(id, review.clone().into_review(id, product_id));
        // A concurrent delete_product may have swept before this insert landed.
        if self.products.pin().get(&product_id).is_none() {
            reviews.remove(&id);
            return Err(StorageError::not_found("product", product_id));
        }
        Ok(id)
    }

    async fn update_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
        review: &ReviewInput,
    ) -> Result<(), StorageError> {
        let guard = self.reviews.pin();
        match guard.get(&review_id) {
            Some(existing) if existing.product_id == product_id => {
                guard.insert(review_id, review.clone().into_review(review_id, product_id));
                Ok(())
            }
            _ => Err(StorageError::not_found("review", review_id)),
        }
    }

    async fn delete_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
    ) -> Result<(), StorageError> {
        let guard = self.reviews.pin();
        match guard.get(&review_id) {
            Some(existing) if existing.product_id == product_id => {
                guard.remove(&review_id);
                Ok(())
            }
            _ => Err(StorageError::not_found("review", review_id)),
        }
    }

    async fn get_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
    ) -> Result<Option<Review>, StorageError> {
        Ok(self
            .reviews
            .pin()
            .get(&review_id)
            .filter(|r| r.product_id == product_id)
            .cloned())
    }

    async fn list_reviews(
        &self,
        product_id: ProductId,
        page: Page,
    ) -> Result<Vec<Review>, StorageError> {
        Ok(window(self.reviews_of(product_id), page))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
