//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Book
//!     products:
//!       - name: Textbook
//!         description: A comprehensive textbook
//!         price: 79.99
//!         quantity: 50
//!         shipping: true
//!         photo: photos/textbook.jpg   # relative to the YAML file
//! ```
//!
//! Categories and products that already exist (by name and slug) are
//! skipped, so seeding twice is harmless.

use std::path::{Path, PathBuf};

use bazaar_core::{Category, Slug};
use bazaar_server::db::{RepositoryError, Repositories};
use bazaar_server::models::{ProductInput, ProductPhoto};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use super::{ConnectError, repositories};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),
}

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub shipping: Option<bool>,
    #[serde(default)]
    pub photo: Option<PathBuf>,
}

/// Totals reported after seeding.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories_created: usize,
    pub products_created: usize,
    pub skipped: usize,
}

/// Problems that would make the database reject the file.
pub fn validate(file: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    for category in &file.categories {
        if Slug::from_name(&category.name).is_err() {
            errors.push(format!("category {:?}: name has no letters or digits", category.name));
        }
        for product in &category.products {
            let label = format!("product {:?}", product.name);
            if Slug::from_name(&product.name).is_err() {
                errors.push(format!("{label}: name has no letters or digits"));
            }
            if product.description.trim().is_empty() {
                errors.push(format!("{label}: description is required"));
            }
            if product.price.is_sign_negative() {
                errors.push(format!("{label}: price must not be negative"));
            }
            if product.quantity < 0 {
                errors.push(format!("{label}: quantity must not be negative"));
            }
        }
    }
    errors
}

fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

async fn read_photo(base: &Path, photo: &Path) -> Result<ProductPhoto, SeedError> {
    let path = base.join(photo);
    let data = tokio::fs::read(&path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.clone(),
            source,
        })?;
    Ok(ProductPhoto {
        data,
        content_type: content_type(&path).to_owned(),
    })
}

async fn ensure_category(
    repos: &Repositories,
    name: &str,
    summary: &mut SeedSummary,
) -> Result<Category, SeedError> {
    if let Some(existing) = repos.categories.get_by_name(name).await? {
        summary.skipped += 1;
        return Ok(existing);
    }
    let slug = Slug::from_name(name).map_err(|_| SeedError::Invalid(1))?;
    let category = repos.categories.create(name, &slug).await?;
    info!(category = %category.name, "Category created");
    summary.categories_created += 1;
    Ok(category)
}

/// Load `file_path` into the catalog.
pub async fn catalog(file_path: &Path) -> Result<SeedSummary, SeedError> {
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| SeedError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let file: SeedFile = serde_yaml::from_str(&content)?;
    info!(categories = file.categories.len(), "Parsed seed file");

    let errors = validate(&file);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let base = file_path.parent().unwrap_or_else(|| Path::new("."));
    let repos = repositories().await?;
    let mut summary = SeedSummary::default();

    for seed_category in file.categories {
        let category = ensure_category(&repos, &seed_category.name, &mut summary).await?;

        for product in seed_category.products {
            let name = product.name.trim().to_owned();
            let slug = Slug::from_name(&name).map_err(|_| SeedError::Invalid(1))?;
            if repos.products.get_by_slug(&slug).await?.is_some() {
                summary.skipped += 1;
                continue;
            }

            let photo = match &product.photo {
                Some(path) => Some(read_photo(base, path).await?),
                None => None,
            };
            let input = ProductInput {
                name,
                slug,
                description: product.description,
                price: product.price.round_dp(2),
                category_id: category.id,
                quantity: product.quantity,
                shipping: product.shipping,
                photo,
            };
            let created = repos.products.create(&input).await?;
            info!(product = %created.name, category = %category.name, "Product created");
            summary.products_created += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Categories created: {}", summary.categories_created);
    info!("  Products created: {}", summary.products_created);
    info!("  Skipped (already exist): {}", summary.skipped);
    Ok(summary)
}
