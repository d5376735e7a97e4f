//! Volatile-store key layout.
//!
//! Every cache entry of a product lives under `products:{id}:` so a single
//! prefix scan removes all of them. Lock keys sit outside that namespace and
//! survive invalidation.

use catalog_core::{Page, ProductId, ReviewId};

pub fn rating(product_id: ProductId) -> String {
    format!("products:{product_id}:rating")
}

pub fn review(product_id: ProductId, review_id: ReviewId) -> String {
    format!("products:{product_id}:review:{review_id}")
}

pub fn review_list(product_id: ProductId, page: Page) -> String {
    format!(
        "products:{product_id}:reviews:{}:{}",
        page.offset, page.limit
    )
}

/// Prefix shared by every cache entry of the product.
pub fn product_prefix(product_id: ProductId) -> String {
    format!("products:{product_id}:")
}

pub fn product_lock(product_id: ProductId) -> String {
    format!("products:locks:{product_id}")
}
