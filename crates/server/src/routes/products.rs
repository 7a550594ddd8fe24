//! Product catalog handlers under `/api/v1/product`.
//!
//! Create and update take `multipart/form-data` so the photo can travel with
//! the fields. Listings never include photo bytes; clients fetch them from
//! `/product-photo/{pid}` when `hasPhoto` is set.

use std::str::FromStr;

use axum::{
    extract::{Multipart, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{Category, CategoryId, Product, ProductId, Slug};

use super::extract::{AppJson, AppPath, present, required};
use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::models::{ProductFilter, ProductInput, ProductPhoto};
use crate::state::AppState;

/// Largest accepted photo upload.
pub const MAX_PHOTO_BYTES: usize = 1_000_000;

/// Request body limit on create and update, above [`MAX_PHOTO_BYTES`] so
/// oversized photos reach the handler's own check.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

const PHOTO_TOO_LARGE: &str = "Photo is required and should be less than 1mb";

/// Products returned by `/get-product`.
pub const HOME_PAGE_LIMIT: i64 = 12;

/// Products per `/product-list/{page}` page.
pub const PER_PAGE: i64 = 6;

/// Products returned by `/related-product`.
pub const RELATED_LIMIT: i64 = 3;

/// Largest price the `NUMERIC(12,2)` column holds.
const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

// =============================================================================
// Request Types
// =============================================================================

/// Raw multipart fields, before validation.
#[derive(Debug, Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<String>,
    category: Option<String>,
    quantity: Option<String>,
    shipping: Option<String>,
    photo: Option<ProductPhoto>,
}

impl ProductForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "photo" => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_owned();
                    let data = field.bytes().await.map_err(|e| {
                        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                            AppError::BadRequest(PHOTO_TOO_LARGE.to_string())
                        } else {
                            e.into()
                        }
                    })?;
                    if data.len() > MAX_PHOTO_BYTES {
                        return Err(AppError::BadRequest(PHOTO_TOO_LARGE.to_string()));
                    }
                    if !data.is_empty() {
                        form.photo = Some(ProductPhoto {
                            data: data.to_vec(),
                            content_type,
                        });
                    }
                }
                "name" => form.name = Some(field.text().await?),
                "description" => form.description = Some(field.text().await?),
                "price" => form.price = Some(field.text().await?),
                "category" => form.category = Some(field.text().await?),
                "quantity" => form.quantity = Some(field.text().await?),
                "shipping" => form.shipping = Some(field.text().await?),
                other => tracing::debug!(field = other, "Ignoring unknown product field"),
            }
        }
        Ok(form)
    }

    /// Validate fields in the order clients expect errors to be reported.
    fn validate(self) -> Result<ProductInput> {
        let name = required(self.name, "Name")?.trim().to_owned();
        let description = required(self.description, "Description")?;
        let price = required(self.price, "Price")?;
        let category = required(self.category, "Category")?;
        let quantity = required(self.quantity, "Quantity")?;

        let price = Decimal::from_str(price.trim())
            .map_err(|_| AppError::BadRequest("Price must be a number".to_string()))?
            .round_dp(2);
        if price.is_sign_negative() {
            return Err(AppError::BadRequest("Price must not be negative".to_string()));
        }
        if price > MAX_PRICE {
            return Err(AppError::BadRequest("Price is too large".to_string()));
        }

        let category_id = CategoryId::from_str(&category)
            .map_err(|_| AppError::BadRequest("Category must be a category id".to_string()))?;

        let quantity = quantity
            .trim()
            .parse::<i32>()
            .map_err(|_| AppError::BadRequest("Quantity must be a whole number".to_string()))?;
        if quantity < 0 {
            return Err(AppError::BadRequest("Quantity must not be negative".to_string()));
        }

        let shipping = present(self.shipping)
            .map(|s| parse_flag(&s))
            .transpose()?;

        let slug = Slug::from_name(&name)
            .map_err(|_| AppError::BadRequest("Name must contain letters or digits".to_string()))?;

        Ok(ProductInput {
            name,
            slug,
            description,
            price,
            category_id,
            quantity,
            shipping,
            photo: self.photo,
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(AppError::BadRequest("Shipping must be true or false".to_string())),
    }
}

/// Sidebar filter body: `{ checked: [categoryId], radio: [min, max] }`.
#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub checked: Vec<CategoryId>,
    #[serde(default)]
    pub radio: Vec<Decimal>,
}

impl TryFrom<FilterRequest> for ProductFilter {
    type Error = AppError;

    fn try_from(body: FilterRequest) -> Result<Self> {
        let price_range = match body.radio.as_slice() {
            [] => None,
            [min, max] => Some((*min, *max)),
            _ => {
                return Err(AppError::BadRequest(
                    "radio must be a [min, max] price range".to_string(),
                ));
            }
        };
        Ok(Self {
            categories: body.checked,
            price_range,
        })
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SavedProductResponse {
    pub success: bool,
    pub message: &'static str,
    pub products: Product,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub success: bool,
    pub count_total: usize,
    pub message: &'static str,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct SingleProductResponse {
    pub success: bool,
    pub message: &'static str,
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub success: bool,
    pub products: Vec<Product>,
}

impl ProductsResponse {
    const fn new(products: Vec<Product>) -> Self {
        Self {
            success: true,
            products,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub success: bool,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CategoryProductsResponse {
    pub success: bool,
    pub category: Category,
    pub products: Vec<Product>,
}

// =============================================================================
// Handlers
// =============================================================================

fn product_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
        other => other.into(),
    }
}

async fn ensure_category(state: &AppState, id: CategoryId) -> Result<()> {
    if state.repos().categories.get_by_id(id).await?.is_none() {
        return Err(AppError::NotFound("Category not found".to_string()));
    }
    Ok(())
}

/// `POST /create-product`
pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let input = ProductForm::read(multipart).await?.validate()?;
    ensure_category(&state, input.category_id).await?;

    let product = state.repos().products.create(&input).await?;
    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");

    Ok((
        StatusCode::CREATED,
        AppJson(SavedProductResponse {
            success: true,
            message: "Product created successfully",
            products: product,
        }),
    ))
}

/// `PUT /update-product/{pid}`
pub async fn update(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let input = ProductForm::read(multipart).await?.validate()?;
    ensure_category(&state, input.category_id).await?;

    let product = state
        .repos()
        .products
        .update(id, &input)
        .await
        .map_err(product_not_found)?;
    tracing::info!(product_id = %product.id, "Product updated");

    Ok((
        StatusCode::CREATED,
        AppJson(SavedProductResponse {
            success: true,
            message: "Product updated successfully",
            products: product,
        }),
    ))
}

/// `GET /get-product`
pub async fn list(State(state): State<AppState>) -> Result<AppJson<ProductListResponse>> {
    let products = state
        .repos()
        .products
        .list_recent(HOME_PAGE_LIMIT, 0)
        .await?;

    Ok(AppJson(ProductListResponse {
        success: true,
        count_total: products.len(),
        message: "All products",
        products,
    }))
}

/// `GET /get-product/{slug}`
pub async fn single(
    State(state): State<AppState>,
    AppPath(slug): AppPath<String>,
) -> Result<AppJson<SingleProductResponse>> {
    let not_found = || AppError::NotFound("Product not found".to_string());
    let slug = Slug::parse(&slug).map_err(|_| not_found())?;
    let product = state
        .repos()
        .products
        .get_by_slug(&slug)
        .await?
        .ok_or_else(not_found)?;

    Ok(AppJson(SingleProductResponse {
        success: true,
        message: "Single product fetched",
        product,
    }))
}

/// `GET /product-photo/{pid}`
pub async fn photo(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> Result<impl IntoResponse> {
    let photo = state
        .repos()
        .products
        .photo(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Photo not found".to_string()))?;

    Ok(([(header::CONTENT_TYPE, photo.content_type)], photo.data))
}

/// `DELETE /delete-product/{pid}`
pub async fn delete(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> Result<AppJson<MessageResponse>> {
    state
        .repos()
        .products
        .delete(id)
        .await
        .map_err(product_not_found)?;

    tracing::info!(product_id = %id, "Product deleted");
    Ok(AppJson(MessageResponse {
        success: true,
        message: "Product deleted successfully",
    }))
}

/// `POST /product-filters`
pub async fn filter(
    State(state): State<AppState>,
    AppJson(body): AppJson<FilterRequest>,
) -> Result<AppJson<ProductsResponse>> {
    let filter = ProductFilter::try_from(body)?;
    let products = state.repos().products.filter(&filter).await?;
    Ok(AppJson(ProductsResponse::new(products)))
}

/// `GET /product-count`
pub async fn count(State(state): State<AppState>) -> Result<AppJson<CountResponse>> {
    let total = state.repos().products.count().await?;
    Ok(AppJson(CountResponse {
        success: true,
        total,
    }))
}

/// Offset of a 1-based page; pages below 1 read as page 1.
#[must_use]
pub const fn page_offset(page: i64) -> i64 {
    let page = if page < 1 { 1 } else { page };
    (page - 1).saturating_mul(PER_PAGE)
}

/// `GET /product-list/{page}`
pub async fn page(
    State(state): State<AppState>,
    AppPath(page): AppPath<i64>,
) -> Result<AppJson<ProductsResponse>> {
    let products = state
        .repos()
        .products
        .list_recent(PER_PAGE, page_offset(page))
        .await?;
    Ok(AppJson(ProductsResponse::new(products)))
}

/// `GET /search/{keyword}`
pub async fn search(
    State(state): State<AppState>,
    AppPath(keyword): AppPath<String>,
) -> Result<AppJson<Vec<Product>>> {
    let products = state.repos().products.search(&keyword).await?;
    Ok(AppJson(products))
}

/// `GET /related-product/{pid}/{cid}`
pub async fn related(
    State(state): State<AppState>,
    AppPath((product, category)): AppPath<(ProductId, CategoryId)>,
) -> Result<AppJson<ProductsResponse>> {
    let products = state
        .repos()
        .products
        .related(product, category, RELATED_LIMIT)
        .await?;
    Ok(AppJson(ProductsResponse::new(products)))
}

/// `GET /product-category/{slug}`
pub async fn by_category(
    State(state): State<AppState>,
    AppPath(slug): AppPath<String>,
) -> Result<AppJson<CategoryProductsResponse>> {
    let not_found = || AppError::NotFound("Category not found".to_string());
    let slug = Slug::parse(&slug).map_err(|_| not_found())?;
    let category = state
        .repos()
        .categories
        .get_by_slug(&slug)
        .await?
        .ok_or_else(not_found)?;
    let products = state.repos().products.list_by_category(category.id).await?;

    Ok(AppJson(CategoryProductsResponse {
        success: true,
        category,
        products,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: Some("Textbook".to_string()),
            description: Some("A comprehensive textbook".to_string()),
            price: Some("79.99".to_string()),
            category: Some("1".to_string()),
            quantity: Some("50".to_string()),
            shipping: None,
            photo: None,
        }
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::BadRequest(m) => m,
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_form() {
        let input = form().validate().unwrap();
        assert_eq!(input.slug.as_str(), "Textbook");
        assert_eq!(input.price, Decimal::new(7999, 2));
        assert_eq!(input.category_id, CategoryId::new(1));
        assert_eq!(input.shipping, None);
    }

    #[test]
    fn test_first_missing_field_reported() {
        let mut f = form();
        f.description = None;
        f.quantity = Some(String::new());
        assert_eq!(message(f.validate().unwrap_err()), "Description is required");
    }

    #[test]
    fn test_negative_values_rejected() {
        let mut f = form();
        f.price = Some("-1".to_string());
        assert_eq!(message(f.validate().unwrap_err()), "Price must not be negative");

        let mut f = form();
        f.quantity = Some("-3".to_string());
        assert_eq!(message(f.validate().unwrap_err()), "Quantity must not be negative");
    }

    #[test]
    fn test_shipping_flag() {
        let mut f = form();
        f.shipping = Some("1".to_string());
        assert_eq!(f.validate().unwrap().shipping, Some(true));

        let mut f = form();
        f.shipping = Some("maybe".to_string());
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_filter_radio_shape() {
        let body = FilterRequest {
            checked: vec![],
            radio: vec![Decimal::ZERO, Decimal::new(19, 0)],
        };
        let filter = ProductFilter::try_from(body).unwrap();
        assert_eq!(filter.price_range, Some((Decimal::ZERO, Decimal::new(19, 0))));

        let body = FilterRequest {
            checked: vec![],
            radio: vec![Decimal::ZERO],
        };
        assert!(ProductFilter::try_from(body).is_err());
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(2), 6);
        assert_eq!(page_offset(0), 0);
        assert_eq!(page_offset(-4), 0);
    }

    #[test]
    fn test_max_price_matches_column() {
        assert_eq!(MAX_PRICE, Decimal::new(9_999_999_999, 2));
    }
}
