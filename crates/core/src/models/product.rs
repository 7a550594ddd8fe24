//! Catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Category;
use crate::types::{ProductId, Slug};

/// A product as listed in the catalog.
///
/// The photo bytes are never part of this document; they are served by a
/// dedicated endpoint and `has_photo` tells clients whether to ask for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: Category,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<bool>,
    #[serde(default)]
    pub has_photo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::CategoryId;

    #[test]
    fn test_wire_shape() {
        let product = Product {
            id: ProductId::new(3),
            name: "Textbook".to_string(),
            slug: Slug::from_name("Textbook").unwrap(),
            description: "A comprehensive textbook".to_string(),
            price: Decimal::new(7999, 2),
            category: Category {
                id: CategoryId::new(1),
                name: "Book".to_string(),
                slug: Slug::from_name("Book").unwrap(),
            },
            quantity: 50,
            shipping: None,
            has_photo: true,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["_id"], 3);
        assert_eq!(json["price"], 79.99);
        assert_eq!(json["category"]["slug"], "Book");
        assert_eq!(json["hasPhoto"], true);
        assert!(json.get("shipping").is_none());
        assert!(json.get("createdAt").is_some());
    }
}
