use std::sync::atomic::{AtomicI64, Ordering};

use catalog_core::{Page, Product, ProductId, Review, ReviewId};
use papaya::HashMap as PapayaHashMap;

/// In-memory catalog storage using papaya lock-free hash maps.
///
/// Identities are assigned from per-entity atomic counters starting at 1,
/// matching the sequence behavior of the relational backend.
#[derive(Debug)]
pub struct InMemoryStorage {
    pub(crate) products: PapayaHashMap<ProductId, Product>,
    pub(crate) reviews: PapayaHashMap<ReviewId, Review>,
    product_seq: AtomicI64,
    review_seq: AtomicI64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            products: PapayaHashMap::new(),
            reviews: PapayaHashMap::new(),
            product_seq: AtomicI64::new(1),
            review_seq: AtomicI64::new(1),
        }
    }

    pub(crate) fn next_product_id(&self) -> i64 {
        self.product_seq.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn next_review_id(&self) -> i64 {
        self.review_seq.fetch_add(1, Ordering::SeqCst)
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }

    /// Snapshot of a product's reviews ordered by identity.
    pub(crate) fn reviews_of(&self, product_id: ProductId) -> Vec<Review> {
        let guard = self.reviews.pin();
        let mut reviews: Vec<Review> = guard
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by_key(|r| r.id);
        reviews
    }

    /// Removes every review owned by the product, returning how many were dropped.
    pub(crate) fn remove_reviews_of(&self, product_id: ProductId) -> usize {
        let guard = self.reviews.pin();
        let owned: Vec<ReviewId> = guard
            .iter()
            .filter(|(_, r)| r.product_id == product_id)
            .map(|(id, _)| *id)
            .collect();
        owned.iter().filter(|id| guard.remove(*id).is_some()).count()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies an offset/limit window to an already ordered listing.
pub(crate) fn window<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}
