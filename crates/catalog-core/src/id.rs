//! Entity identifiers.
//!
//! Identities are opaque positive integers assigned by the source store.
//! Products and reviews get distinct newtypes so a review id can never be
//! passed where a product id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("identifier must be a positive integer, got {0}")]
    NotPositive(i64),

    #[error("identifier is not an integer: {0}")]
    Malformed(String),
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier, rejecting zero and negative values.
            pub fn new(raw: i64) -> Result<Self, IdError> {
                if raw > 0 {
                    Ok(Self(raw))
                } else {
                    Err(IdError::NotPositive(raw))
                }
            }

            /// Returns the raw integer value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| IdError::Malformed(s.to_string()))?;
                Self::new(raw)
            }
        }

        impl TryFrom<i64> for $name {
            type Error = IdError;

            fn try_from(raw: i64) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }
    };
}

entity_id!(
    /// Identity of a product.
    ProductId
);

entity_id!(
    /// Identity of a review. Reviews are always addressed together with
    /// their owning [`ProductId`] at the cache and notification layers.
    ReviewId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_ids_only() {
        assert_eq!(ProductId::new(1).unwrap().get(), 1);
        assert_eq!(ProductId::new(0), Err(IdError::NotPositive(0)));
        assert_eq!(ReviewId::new(-3), Err(IdError::NotPositive(-3)));
    }

    #[test]
    fn test_parse() {
        assert_eq!("42".parse::<ProductId>().unwrap().get(), 42);
        assert!(matches!("abc".parse::<ReviewId>(), Err(IdError::Malformed(_))));
        assert!(matches!("0".parse::<ReviewId>(), Err(IdError::NotPositive(0))));
    }

    #[test]
    fn test_serde_transparent() {
        let id = ProductId::new(7).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: ProductId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
    }
}
