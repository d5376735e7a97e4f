//! Change notifications published after catalog writes.
//!
//! Events are best-effort: they are emitted after the source store commit and
//! after cache invalidation, and their delivery never affects the outcome of
//! the write that produced them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{ProductId, ReviewId};

/// Default topic used by the notifier and the audit subscriber.
pub const REVIEWS_TOPIC: &str = "reviews";

/// Kind of write that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogAction {
    Create,
    Update,
    Delete,
}

impl CatalogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for CatalogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload published on the events topic.
///
/// `review_id` is absent for product-level writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEvent {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_id: Option<ReviewId>,
    pub action: CatalogAction,
}

impl CatalogEvent {
    pub fn product(product_id: ProductId, action: CatalogAction) -> Self {
        Self {
            product_id,
            review_id: None,
            action,
        }
    }

    pub fn review(product_id: ProductId, review_id: ReviewId, action: CatalogAction) -> Self {
        Self {
            product_id,
            review_id: Some(review_id),
            action,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

impl fmt::Display for CatalogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.review_id {
            Some(review_id) => write!(
                f,
                "{} product={} review={}",
                self.action, self.product_id, review_id
            ),
            None => write!(f, "{} product={}", self.action, self.product_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_event_wire_format() {
        let event = CatalogEvent::review(
            ProductId::new(1).unwrap(),
            ReviewId::new(7).unwrap(),
            CatalogAction::Create,
        );
        assert_eq!(
            event.to_json().unwrap(),
            r#"{"product_id":1,"review_id":7,"action":"create"}"#
        );
    }

    #[test]
    fn test_product_event_omits_review() {
        let event = CatalogEvent::product(ProductId::new(3).unwrap(), CatalogAction::Delete);
        let json = event.to_json().unwrap();
        assert_eq!(json, r#"{"product_id":3,"action":"delete"}"#);
        assert_eq!(CatalogEvent::from_json(&json).unwrap(), event);
    }

    #[test]
    fn test_rejects_unknown_action() {
        assert!(CatalogEvent::from_json(r#"{"product_id":1,"action":"purge"}"#).is_err());
    }

    #[test]
    fn test_display() {
        let event = CatalogEvent::review(
            ProductId::new(2).unwrap(),
            ReviewId::new(5).unwrap(),
            CatalogAction::Update,
        );
        assert_eq!(event.to_string(), "update product=2 review=5");
    }
}
