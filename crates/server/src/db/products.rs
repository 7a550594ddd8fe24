//! Product repository.
//!
//! Every read joins the owning category so products come back populated.
//! Photo bytes are only read by [`ProductRepository::photo`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{Category, CategoryId, Product, ProductId, Slug, SlugError};

use super::RepositoryError;
use crate::models::{ProductFilter, ProductInput, ProductPhoto};

/// Storage for catalog products.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken or
    /// the category does not exist.
    async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError>;

    /// Replace a product's fields. A `None` photo keeps the stored one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID and
    /// `RepositoryError::Conflict` on a name or slug collision.
    async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError>;

    /// Get a product by ID.
    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Get a product by slug.
    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError>;

    /// Get every listed product that exists; unknown IDs are skipped.
    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// The stored photo, if the product exists and has one.
    async fn photo(&self, id: ProductId) -> Result<Option<ProductPhoto>, RepositoryError>;

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID.
    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError>;

    /// Newest-first page of products.
    async fn list_recent(&self, limit: i64, offset: i64)
    -> Result<Vec<Product>, RepositoryError>;

    /// Total number of products.
    async fn count(&self) -> Result<i64, RepositoryError>;

    /// Products matching a category/price filter, newest first.
    async fn filter(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    /// Case-insensitive substring search over name and description.
    async fn search(&self, keyword: &str) -> Result<Vec<Product>, RepositoryError>;

    /// Other products in the same category, newest first.
    async fn related(
        &self,
        product: ProductId,
        category: CategoryId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Every product in a category, newest first.
    async fn list_by_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError>;
}

pub(super) const PRODUCT_COLUMNS: &str = r"
    p.id, p.name, p.slug, p.description, p.price, p.quantity, p.shipping,
    (p.photo IS NOT NULL) AS has_photo, p.created_at, p.updated_at,
    c.id AS category_id, c.name AS category_name, c.slug AS category_slug
";

#[derive(sqlx::FromRow)]
pub(super) struct ProductRow {
    id: ProductId,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    quantity: i32,
    shipping: Option<bool>,
    has_photo: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_id: CategoryId,
    category_name: String,
    category_slug: String,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let corrupt =
            |e: SlugError| RepositoryError::DataCorruption(format!("invalid slug in database: {e}"));
        Ok(Self {
            id: row.id,
            name: row.name,
            slug: Slug::parse(&row.slug).map_err(corrupt)?,
            description: row.description,
            price: row.price,
            category: Category {
                id: row.category_id,
                name: row.category_name,
                slug: Slug::parse(&row.category_slug).map_err(corrupt)?,
            },
            quantity: row.quantity,
            shipping: row.shipping,
            has_photo: row.has_photo,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Escape `LIKE` metacharacters so a keyword is matched literally.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `PostgreSQL`-backed [`ProductRepository`].
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_required(&self, id: ProductId) -> Result<Product, RepositoryError> {
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let (photo, content_type) = input
            .photo
            .as_ref()
            .map(|p| (p.data.as_slice(), p.content_type.as_str()))
            .unzip();

        let id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO products
                (name, slug, description, price, category_id, quantity, shipping,
                 photo, photo_content_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(&input.name)
        .bind(input.slug.as_str())
        .bind(&input.description)
        .bind(input.price)
        .bind(input.category_id)
        .bind(input.quantity)
        .bind(input.shipping)
        .bind(photo)
        .bind(content_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already exists"))?;

        self.fetch_required(id).await
    }

    async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let (photo, content_type) = input
            .photo
            .as_ref()
            .map(|p| (p.data.as_slice(), p.content_type.as_str()))
            .unzip();

        let updated: Option<ProductId> = sqlx::query_scalar(
            r"
            UPDATE products
            SET name = $2,
                slug = $3,
                description = $4,
                price = $5,
                category_id = $6,
                quantity = $7,
                shipping = $8,
                photo = COALESCE($9, photo),
                photo_content_type = COALESCE($10, photo_content_type),
                updated_at = now()
            WHERE id = $1
            RETURNING id
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.slug.as_str())
        .bind(&input.description)
        .bind(input.price)
        .bind(input.category_id)
        .bind(input.quantity)
        .bind(input.shipping)
        .bind(photo)
        .bind(content_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already exists"))?;

        match updated {
            Some(id) => self.fetch_required(id).await,
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE p.id = $1"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE p.slug = $1"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE p.id = ANY($1)"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        into_products(rows)
    }

    async fn photo(&self, id: ProductId) -> Result<Option<ProductPhoto>, RepositoryError> {
        let row: Option<(Option<Vec<u8>>, Option<String>)> =
            sqlx::query_as("SELECT photo, photo_content_type FROM products WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match row {
            Some((Some(data), content_type)) => Some(ProductPhoto {
                data,
                content_type: content_type
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
            }),
            _ => None,
        })
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_recent(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p JOIN categories c ON c.id = p.category_id \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        into_products(rows)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn filter(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let (min, max) = filter.price_range.unzip();
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE (cardinality($1::int4[]) = 0 OR p.category_id = ANY($1)) \
               AND ($2::numeric IS NULL OR p.price >= $2) \
               AND ($3::numeric IS NULL OR p.price <= $3) \
             ORDER BY p.created_at DESC, p.id DESC"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&filter.categories)
            .bind(min)
            .bind(max)
            .fetch_all(&self.pool)
            .await?;
        into_products(rows)
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE p.name ILIKE $1 OR p.description ILIKE $1 \
             ORDER BY p.created_at DESC, p.id DESC"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(like_pattern(keyword))
            .fetch_all(&self.pool)
            .await?;
        into_products(rows)
    }

    async fn related(
        &self,
        product: ProductId,
        category: CategoryId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE p.category_id = $1 AND p.id <> $2 \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $3"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(category)
            .bind(product)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        into_products(rows)
    }

    async fn list_by_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p JOIN categories c ON c.id = p.category_id \
             WHERE p.category_id = $1 \
             ORDER BY p.created_at DESC, p.id DESC"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;
        into_products(rows)
    }
}
