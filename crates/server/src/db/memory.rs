//! In-memory implementation of every repository.
//!
//! Mirrors the `PostgreSQL` constraints that handlers rely on: unique
//! emails, names and slugs, restricted category deletion, and orders whose
//! product list silently drops deleted products.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use bazaar_core::{
    Buyer, Category, CategoryId, Email, Order, OrderId, OrderStatus, Product, ProductId, Role,
    Slug, User, UserId,
};

use super::{
    CategoryRepository, OrderRepository, ProductRepository, RepositoryError, UserRepository,
};
use crate::models::{NewOrder, NewUser, ProductFilter, ProductInput, ProductPhoto, ProfileUpdate};

struct StoredUser {
    user: User,
    password_hash: String,
    answer: String,
}

struct StoredProduct {
    id: ProductId,
    name: String,
    slug: Slug,
    description: String,
    price: Decimal,
    category_id: CategoryId,
    quantity: i32,
    shipping: Option<bool>,
    photo: Option<ProductPhoto>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

struct StoredOrder {
    id: OrderId,
    products: Vec<ProductId>,
    payment: serde_json::Value,
    buyer: UserId,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, StoredUser>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, StoredProduct>,
    orders: BTreeMap<OrderId, StoredOrder>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn populate_product(&self, stored: &StoredProduct) -> Result<Product, RepositoryError> {
        let category = self
            .categories
            .get(&stored.category_id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "product {} references missing category {}",
                    stored.id, stored.category_id
                ))
            })?;

        Ok(Product {
            id: stored.id,
            name: stored.name.clone(),
            slug: stored.slug.clone(),
            description: stored.description.clone(),
            price: stored.price,
            category,
            quantity: stored.quantity,
            shipping: stored.shipping,
            has_photo: stored.photo.is_some(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    /// Products passing `keep`, newest first.
    fn products_where(
        &self,
        keep: impl Fn(&StoredProduct) -> bool,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut matching: Vec<&StoredProduct> = self.products.values().filter(|p| keep(*p)).collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        matching
            .into_iter()
            .map(|p| self.populate_product(p))
            .collect()
    }

    fn populate_order(&self, stored: &StoredOrder) -> Result<Order, RepositoryError> {
        let buyer = self.users.get(&stored.buyer).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "order {} references missing buyer {}",
                stored.id, stored.buyer
            ))
        })?;

        let products = stored
            .products
            .iter()
            .filter_map(|id| self.products.get(id))
            .map(|p| self.populate_product(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Order {
            id: stored.id,
            products,
            payment: stored.payment.clone(),
            buyer: Buyer {
                id: buyer.user.id,
                name: buyer.user.name.clone(),
            },
            status: stored.status,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    fn orders_where(
        &self,
        keep: impl Fn(&StoredOrder) -> bool,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut matching: Vec<&StoredOrder> = self.orders.values().filter(|o| keep(*o)).collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        matching
            .into_iter()
            .map(|o| self.populate_order(o))
            .collect()
    }

    fn check_product_unique(
        &self,
        input: &ProductInput,
        except: Option<ProductId>,
    ) -> Result<(), RepositoryError> {
        let taken = self.products.values().any(|p| {
            Some(p.id) != except && (p.name == input.name || p.slug == input.slug)
        });
        if taken {
            return Err(RepositoryError::Conflict("product already exists".to_string()));
        }
        if !self.categories.contains_key(&input.category_id) {
            return Err(RepositoryError::Conflict(
                "category does not exist".to_string(),
            ));
        }
        Ok(())
    }
}

/// Process-local store backing all four repository traits.
///
/// Cloning the `Arc` that holds it shares the data, so one instance serves
/// as users, categories, products and orders at once.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.user.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_string()));
        }

        let now = Utc::now();
        let id = UserId::new(tables.next_id());
        let created = User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            dob: user.dob,
            role: Role::Buyer,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            id,
            StoredUser {
                user: created.clone(),
                password_hash: user.password_hash.clone(),
                answer: user.answer.clone(),
            },
        );
        Ok(created)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|u| u.user.clone()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| &u.user.email == email)
            .map(|u| u.user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| &u.user.email == email)
            .map(|u| (u.user.clone(), u.password_hash.clone())))
    }

    async fn find_by_email_and_answer(
        &self,
        email: &Email,
        answer: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| &u.user.email == email && u.answer == answer)
            .map(|u| u.user.clone()))
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let stored = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut stored.password_hash);
        stored.user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let stored = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        if let Some(name) = &update.name {
            stored.user.name.clone_from(name);
        }
        if let Some(hash) = &update.password_hash {
            stored.password_hash.clone_from(hash);
        }
        if let Some(phone) = &update.phone {
            stored.user.phone.clone_from(phone);
        }
        if let Some(address) = &update.address {
            stored.user.address.clone_from(address);
        }
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let stored = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.user.role = role;
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, name: &str, slug: &Slug) -> Result<Category, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .categories
            .values()
            .any(|c| c.name == name || &c.slug == slug)
        {
            return Err(RepositoryError::Conflict("category already exists".to_string()));
        }

        let category = Category {
            id: CategoryId::new(tables.next_id()),
            name: name.to_owned(),
            slug: slug.clone(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().find(|c| c.name == name).cloned())
    }

    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().find(|c| &c.slug == slug).cloned())
    }

    async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn update(
        &self,
        id: CategoryId,
        name: &str,
        slug: &Slug,
    ) -> Result<Category, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .categories
            .values()
            .any(|c| c.id != id && (c.name == name || &c.slug == slug))
        {
            return Err(RepositoryError::Conflict("category already exists".to_string()));
        }

        let category = tables
            .categories
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        name.clone_into(&mut category.name);
        category.slug = slug.clone();
        Ok(category.clone())
    }

    async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.products.values().any(|p| p.category_id == id) {
            return Err(RepositoryError::Conflict(
                "category still has products".to_string(),
            ));
        }
        tables.categories.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.check_product_unique(input, None)?;

        let now = Utc::now();
        let stored = StoredProduct {
            id: ProductId::new(tables.next_id()),
            name: input.name.clone(),
            slug: input.slug.clone(),
            description: input.description.clone(),
            price: input.price,
            category_id: input.category_id,
            quantity: input.quantity,
            shipping: input.shipping,
            photo: input.photo.clone(),
            created_at: now,
            updated_at: now,
        };
        let product = tables.populate_product(&stored)?;
        tables.products.insert(stored.id, stored);
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        tables.check_product_unique(input, Some(id))?;

        let stored = tables.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.name.clone_from(&input.name);
        stored.slug = input.slug.clone();
        stored.description.clone_from(&input.description);
        stored.price = input.price;
        stored.category_id = input.category_id;
        stored.quantity = input.quantity;
        stored.shipping = input.shipping;
        if let Some(photo) = &input.photo {
            stored.photo = Some(photo.clone());
        }
        stored.updated_at = Utc::now();

        let tables = &*tables;
        tables
            .products
            .get(&id)
            .ok_or(RepositoryError::NotFound)
            .and_then(|p| tables.populate_product(p))
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        tables
            .products
            .get(&id)
            .map(|p| tables.populate_product(p))
            .transpose()
    }

    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        tables
            .products
            .values()
            .find(|p| &p.slug == slug)
            .map(|p| tables.populate_product(p))
            .transpose()
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        tables.products_where(|p| ids.contains(&p.id))
    }

    async fn photo(&self, id: ProductId) -> Result<Option<ProductPhoto>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.products.get(&id).and_then(|p| p.photo.clone()))
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_recent(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        let all = tables.products_where(|_| true)?;
        let skip = usize::try_from(offset).unwrap_or(0);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(all.into_iter().skip(skip).take(take).collect())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(i64::try_from(tables.products.len()).unwrap_or(i64::MAX))
    }

    async fn filter(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        tables.products_where(|p| filter.matches(p.category_id, p.price))
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Product>, RepositoryError> {
        let needle = keyword.to_lowercase();
        let tables = self.tables.read().await;
        tables.products_where(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        })
    }

    async fn related(
        &self,
        product: ProductId,
        category: CategoryId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        let take = usize::try_from(limit).unwrap_or(0);
        let mut related =
            tables.products_where(|p| p.category_id == category && p.id != product)?;
        related.truncate(take);
        Ok(related)
    }

    async fn list_by_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        tables.products_where(|p| p.category_id == category)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&order.buyer) {
            return Err(RepositoryError::Conflict("buyer does not exist".to_string()));
        }
        if order.products.iter().any(|id| !tables.products.contains_key(id)) {
            return Err(RepositoryError::Conflict(
                "product does not exist".to_string(),
            ));
        }

        let now = Utc::now();
        let stored = StoredOrder {
            id: OrderId::new(tables.next_id()),
            products: order.products.clone(),
            payment: order.payment.clone(),
            buyer: order.buyer,
            status: OrderStatus::default(),
            created_at: now,
            updated_at: now,
        };
        let created = tables.populate_order(&stored)?;
        tables.orders.insert(stored.id, stored);
        Ok(created)
    }

    async fn list_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        tables.orders_where(|o| o.buyer == buyer)
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        tables.orders_where(|_| true)
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let stored = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.status = status;
        stored.updated_at = Utc::now();

        let tables = &*tables;
        tables
            .orders
            .get(&id)
            .ok_or(RepositoryError::NotFound)
            .and_then(|o| tables.populate_order(o))
    }
}
