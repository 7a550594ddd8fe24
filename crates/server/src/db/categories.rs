//! Category repository.

use async_trait::async_trait;
use sqlx::PgPool;

use bazaar_core::{Category, CategoryId, Slug};

use super::RepositoryError;

/// Storage for product categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    async fn create(&self, name: &str, slug: &Slug) -> Result<Category, RepositoryError>;

    /// Get a category by ID.
    async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;

    /// Get a category by exact (case-sensitive) name.
    async fn get_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError>;

    /// Get a category by slug.
    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError>;

    /// All categories, ordered by name.
    async fn list(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID and
    /// `RepositoryError::Conflict` if the new name or slug is taken.
    async fn update(
        &self,
        id: CategoryId,
        name: &str,
        slug: &Slug,
    ) -> Result<Category, RepositoryError>;

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID and
    /// `RepositoryError::Conflict` while products still reference it.
    async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError>;
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid category slug in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            slug,
        })
    }
}

/// `PostgreSQL`-backed [`CategoryRepository`].
pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        sql: &'static str,
        value: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        sqlx::query_as::<_, CategoryRow>(sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .map(Category::try_from)
            .transpose()
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create(&self, name: &str, slug: &Slug) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "category already exists"))?
        .try_into()
    }

    async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        sqlx::query_as::<_, CategoryRow>("SELECT id, name, slug FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Category::try_from)
            .transpose()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        self.fetch_one_where("SELECT id, name, slug FROM categories WHERE name = $1", name)
            .await
    }

    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        self.fetch_one_where(
            "SELECT id, name, slug FROM categories WHERE slug = $1",
            slug.as_str(),
        )
        .await
    }

    async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        sqlx::query_as::<_, CategoryRow>("SELECT id, name, slug FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }

    async fn update(
        &self,
        id: CategoryId,
        name: &str,
        slug: &Slug,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, CategoryRow>(
            "UPDATE categories SET name = $2, slug = $3 WHERE id = $1 RETURNING id, name, slug",
        )
        .bind(id)
        .bind(name)
        .bind(slug.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "category already exists"))?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "category still has products"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
