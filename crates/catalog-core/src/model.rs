//! Catalog entities and the inputs that create or mutate them.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::id::{ProductId, ReviewId};

/// Price as an integer amount of minor currency units.
pub type PriceInCents = i64;

/// Review score, valid in `1..=5`.
pub type Rating = i16;

pub const MIN_RATING: Rating = 1;
pub const MAX_RATING: Rating = 5;

/// A product as persisted by the source store.
///
/// The average rating is derived from reviews and is not part of the stored
/// record; see [`ProductWithRating`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: PriceInCents,
}

/// Product together with its derived average rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductWithRating {
    #[serde(flatten)]
    pub product: Product,
    pub rating: f32,
}

impl ProductWithRating {
    pub fn new(product: Product, rating: f32) -> Self {
        Self { product, rating }
    }
}

/// Fields supplied by a caller when creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: PriceInCents,
}

impl NewProduct {
    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        if self.price <= 0 {
            return Err(CoreError::invalid_field("price", "must be > 0"));
        }
        Ok(())
    }

    /// Materializes the stored form once the source store assigned an id.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
        }
    }
}

/// A review as persisted by the source store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub first_name: String,
    pub last_name: String,
    pub review: String,
    pub rating: Rating,
}

/// Fields supplied by a caller when creating or replacing a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInput {
    pub first_name: String,
    pub last_name: String,
    pub review: String,
    pub rating: Rating,
}

impl ReviewInput {
    pub fn validate(&self) -> Result<()> {
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_text("review", &self.review)?;
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(CoreError::invalid_field(
                "rating",
                format!("must be between {MIN_RATING} and {MAX_RATING}"),
            ));
        }
        Ok(())
    }

    pub fn into_review(self, id: ReviewId, product_id: ProductId) -> Review {
        Review {
            id,
            product_id,
            first_name: self.first_name,
            last_name: self.last_name,
            review: self.review,
            rating: self.rating,
        }
    }
}

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoreError::invalid_field(field, "is required"));
    }
    Ok(())
}

/// Offset/limit window over an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 100;

    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}
