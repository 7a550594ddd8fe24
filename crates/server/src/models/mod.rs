//! Write-side domain types.
//!
//! The documents the API returns live in `bazaar_core::models`; this module
//! holds what handlers hand to the repositories: validated inputs, partial
//! updates and the photo payload that never leaves the server as JSON.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use bazaar_core::{CategoryId, Email, ProductId, Slug, UserId};

/// A validated registration, password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub phone: String,
    pub address: String,
    pub dob: NaiveDate,
    pub answer: String,
}

/// Profile fields a user may change. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A product photo as uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPhoto {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Validated product fields, shared by create and update.
///
/// On update a `photo` of `None` keeps the existing photo.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Decimal,
    pub category_id: CategoryId,
    pub quantity: i32,
    pub shipping: Option<bool>,
    pub photo: Option<ProductPhoto>,
}

/// Catalog filter from the storefront sidebar.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Empty means every category.
    pub categories: Vec<CategoryId>,
    /// Inclusive price bounds.
    pub price_range: Option<(Decimal, Decimal)>,
}

impl ProductFilter {
    /// Whether a product with this category and price passes the filter.
    #[must_use]
    pub fn matches(&self, category: CategoryId, price: Decimal) -> bool {
        let category_ok = self.categories.is_empty() || self.categories.contains(&category);
        let price_ok = self
            .price_range
            .is_none_or(|(min, max)| min <= price && price <= max);
        category_ok && price_ok
    }
}

/// An order about to be recorded after a successful charge.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// One entry per cart line, in cart order.
    pub products: Vec<ProductId>,
    pub payment: serde_json::Value,
    pub buyer: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches() {
        let books = CategoryId::new(1);
        let toys = CategoryId::new(2);

        let everything = ProductFilter::default();
        assert!(everything.matches(toys, Decimal::new(5, 0)));

        let cheap_books = ProductFilter {
            categories: vec![books],
            price_range: Some((Decimal::ZERO, Decimal::new(1999, 2))),
        };
        assert!(cheap_books.matches(books, Decimal::new(1999, 2)));
        assert!(cheap_books.matches(books, Decimal::ZERO));
        assert!(!cheap_books.matches(books, Decimal::new(2000, 2)));
        assert!(!cheap_books.matches(toys, Decimal::new(10, 0)));
    }
}
