//! Shopping cart of product snapshots.

use std::sync::Arc;

use rust_decimal::Decimal;

use bazaar_core::{Product, ProductId};

use super::persisted::Persisted;
use super::store::SessionStore;
use crate::error::SessionError;

const KEY: &str = "cart";

/// The cart, persisted under `cart`.
///
/// Lines are whole product snapshots taken when added; the same product can
/// appear more than once. Prices shown here are the snapshot prices; the
/// server charges current prices at checkout.
#[derive(Debug)]
pub struct CartContext {
    items: Persisted<Vec<Product>>,
}

impl CartContext {
    pub fn load(store: Arc<dyn SessionStore>) -> Self {
        Self {
            items: Persisted::load(store, KEY),
        }
    }

    pub fn items(&self) -> &[Product] {
        self.items.get().map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Product IDs in cart order, one per line.
    pub fn ids(&self) -> Vec<ProductId> {
        self.items().iter().map(|p| p.id).collect()
    }

    /// Sum of snapshot prices.
    pub fn total(&self) -> Decimal {
        self.items().iter().map(|p| p.price).sum()
    }

    /// Append a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written.
    pub fn add(&mut self, product: Product) -> Result<(), SessionError> {
        self.items.update(|items| items.push(product))
    }

    /// Remove the first line for `id`. Returns whether a line was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written.
    pub fn remove(&mut self, id: ProductId) -> Result<bool, SessionError> {
        if !self.items().iter().any(|p| p.id == id) {
            return Ok(false);
        }
        self.items.update(|items| {
            items
                .iter()
                .position(|p| p.id == id)
                .map(|index| items.remove(index))
                .is_some()
        })
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.items.clear()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Category, CategoryId, Slug};
    use chrono::DateTime;

    use super::*;
    use crate::session::MemorySessionStore;

    fn product(id: i32, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Item {id}"),
            slug: Slug::from_name(&format!("Item {id}")).unwrap(),
            description: String::new(),
            price: Decimal::new(cents, 2),
            category: Category {
                id: CategoryId::new(1),
                name: "Book".to_string(),
                slug: Slug::from_name("Book").unwrap(),
            },
            quantity: 5,
            shipping: Some(true),
            has_photo: false,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_remove_first_occurrence_only() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
        let mut cart = CartContext::load(store.clone());

        cart.add(product(1, 500)).unwrap();
        cart.add(product(2, 250)).unwrap();
        cart.add(product(1, 500)).unwrap();
        assert_eq!(cart.total(), Decimal::new(1250, 2));

        assert!(cart.remove(ProductId::new(1)).unwrap());
        assert_eq!(cart.ids(), vec![ProductId::new(2), ProductId::new(1)]);
        assert!(!cart.remove(ProductId::new(9)).unwrap());

        let reloaded = CartContext::load(store);
        assert_eq!(reloaded.ids(), vec![ProductId::new(2), ProductId::new(1)]);
    }

    #[test]
    fn test_clear() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
        let mut cart = CartContext::load(store.clone());
        cart.add(product(3, 100)).unwrap();
        cart.clear().unwrap();

        assert!(cart.is_empty());
        assert!(CartContext::load(store).is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }
}
