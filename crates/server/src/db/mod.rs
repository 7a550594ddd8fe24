//! Persistence for users, the catalog and orders.
//!
//! # Tables
//!
//! - `users` - Accounts, bcrypt password hashes and security answers
//! - `categories` - Category names and slugs
//! - `products` - Catalog entries, including the optional photo blob
//! - `orders` / `order_products` - Placed orders and their cart lines
//!
//! # Backends
//!
//! Each table group sits behind a repository trait. [`Repositories::postgres`]
//! wires the `PostgreSQL` implementations; [`Repositories::in_memory`] wires a
//! single [`memory::MemoryStore`] used by tests and local development.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod categories;
pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use categories::{CategoryRepository, PgCategoryRepository};
pub use memory::MemoryStore;
pub use orders::{OrderRepository, PgOrderRepository};
pub use products::{PgProductRepository, ProductRepository};
pub use users::{PgUserRepository, UserRepository};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique or foreign-key violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_write(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(conflict.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// The set of repositories a running server talks to.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pool: Option<PgPool>,
}

impl Repositories {
    /// Repositories backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            categories: Arc::new(PgCategoryRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Repositories backed by one shared in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            users: store.clone(),
            categories: store.clone(),
            products: store.clone(),
            orders: store,
            pool: None,
        }
    }

    /// Check that the backing store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if `PostgreSQL` does not answer.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
