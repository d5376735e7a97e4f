//! PostgreSQL implementation of the CatalogStorage trait.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;
use tracing::debug;

use catalog_core::{NewProduct, Page, Product, ProductId, Review, ReviewId, ReviewInput};
use catalog_storage::{CatalogStorage, StorageError};

use crate::config::PostgresConfig;
use crate::error::{PG_FOREIGN_KEY_VIOLATION, has_pg_error_code, storage_err};
use crate::pool;

type ProductRow = (i64, String, String, i64);
type ReviewRow = (i64, i64, String, String, String, i16);

const PRODUCT_COLUMNS: &str = "id, product_name, description, price";
const REVIEW_COLUMNS: &str = "id, product_id, first_name, last_name, review, rating";

fn product_from_row((id, name, description, price): ProductRow) -> Result<Product, StorageError> {
    Ok(Product {
        id: ProductId::new(id).map_err(|e| StorageError::internal(e.to_string()))?,
        name,
        description,
        price,
    })
}

fn review_from_row(
    (id, product_id, first_name, last_name, review, rating): ReviewRow,
) -> Result<Review, StorageError> {
    Ok(Review {
        id: ReviewId::new(id).map_err(|e| StorageError::internal(e.to_string()))?,
        product_id: ProductId::new(product_id).map_err(|e| StorageError::internal(e.to_string()))?,
        first_name,
        last_name,
        review,
        rating,
    })
}

/// PostgreSQL source store for products and reviews.
///
/// Expects the `products` and `reviews` tables to exist; schema provisioning
/// is handled outside this service.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connects a new pool with the given configuration.
    pub async fn new(config: &PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(config).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStorage for PostgresStorage {
    async fn create_product(&self, product: &NewProduct) -> Result<ProductId, StorageError> {
        let id: i64 = query_scalar(
            "INSERT INTO products (product_name, description, price) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(product.name.as_str())
        .bind(product.description.as_str())
        .bind(product.price)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(product_id = id, "Product inserted");
        ProductId::new(id).map_err(|e| StorageError::internal(e.to_string()))
    }

    async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<(), StorageError> {
        let result = query(
            "UPDATE products SET product_name = $2, description = $3, price = $4 WHERE id = $1",
        )
        .bind(id.get())
        .bind(product.name.as_str())
        .bind(product.description.as_str())
        .bind(product.price)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("product", id));
        }
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let reviews = query("DELETE FROM reviews WHERE product_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        let deleted = query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await.map_err(storage_err)?;
            return Err(StorageError::not_found("product", id));
        }

        tx.commit().await.map_err(storage_err)?;
        debug!(
            product_id = %id,
            reviews_deleted = reviews.rows_affected(),
            "Product deleted"
        );
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StorageError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row: Option<ProductRow> = query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        row.map(product_from_row).transpose()
    }

    async fn list_products(&self, page: Page) -> Result<Vec<Product>, StorageError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id OFFSET $1 LIMIT $2");
        let rows: Vec<ProductRow> = query_as(&sql)
            .bind(i64::from(page.offset))
            .bind(i64::from(page.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        rows.into_iter().map(product_from_row).collect()
    }

    async fn average_rating(&self, id: ProductId) -> Result<f32, StorageError> {
        query_scalar("SELECT COALESCE(AVG(rating), 0)::real FROM reviews WHERE product_id = $1")
            .bind(id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)
    }

    async fn create_review(
        &self,
        product_id: ProductId,
        review: &ReviewInput,
    ) -> Result<ReviewId, StorageError> {
        // The EXISTS guard turns a missing product into an empty result rather
        // than relying on a foreign key being declared.
        let inserted: Option<i64> = query_scalar(
            r#"INSERT INTO reviews (product_id, first_name, last_name, review, rating)
               SELECT $1, $2, $3, $4, $5
               WHERE EXISTS (SELECT 1 FROM products WHERE id = $1)
               RETURNING id"#,
        )
        .bind(product_id.get())
        .bind(review.first_name.as_str())
        .bind(review.last_name.as_str())
        .bind(review.review.as_str())
        .bind(review.rating)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if has_pg_error_code(&e, PG_FOREIGN_KEY_VIOLATION) {
                StorageError::not_found("product", product_id)
            } else {
                storage_err(e)
            }
        })?;

        let id = inserted.ok_or_else(|| StorageError::not_found("product", product_id))?;
        ReviewId::new(id).map_err(|e| StorageError::internal(e.to_string()))
    }

    async fn update_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
        review: &ReviewInput,
    ) -> Result<(), StorageError> {
        let result = query(
            r#"UPDATE reviews
               SET first_name = $3, last_name = $4, review = $5, rating = $6
               WHERE id = $1 AND product_id = $2"#,
        )
        .bind(review_id.get())
        .bind(product_id.get())
        .bind(review.first_name.as_str())
        .bind(review.last_name.as_str())
        .bind(review.review.as_str())
        .bind(review.rating)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("review", review_id));
        }
        Ok(())
    }

    async fn delete_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
    ) -> Result<(), StorageError> {
        let result = query("DELETE FROM reviews WHERE id = $1 AND product_id = $2")
            .bind(review_id.get())
            .bind(product_id.get())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("review", review_id));
        }
        Ok(())
    }

    async fn get_review(
        &self,
        product_id: ProductId,
        review_id: ReviewId,
    ) -> Result<Option<Review>, StorageError> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1 AND product_id = $2");
        let row: Option<ReviewRow> = query_as(&sql)
            .bind(review_id.get())
            .bind(product_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        row.map(review_from_row).transpose()
    }

    async fn list_reviews(
        &self,
        product_id: ProductId,
        page: Page,
    ) -> Result<Vec<Review>, StorageError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY id OFFSET $2 LIMIT $3"
        );
        let rows: Vec<ReviewRow> = query_as(&sql)
            .bind(product_id.get())
            .bind(i64::from(page.offset))
            .bind(i64::from(page.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        rows.into_iter().map(review_from_row).collect()
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
