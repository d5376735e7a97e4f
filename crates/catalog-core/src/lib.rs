pub mod error;
pub mod events;
pub mod id;
pub mod model;

pub use error::{CoreError, Result};
pub use events::{CatalogAction, CatalogEvent, REVIEWS_TOPIC};
pub use id::{IdError, ProductId, ReviewId};
pub use model::{
    NewProduct, Page, PriceInCents, Product, ProductWithRating, Rating, Review, ReviewInput,
};
