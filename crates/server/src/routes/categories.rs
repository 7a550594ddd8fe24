//! Category handlers under `/api/v1/category`.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

use bazaar_core::{Category, CategoryId, Slug};

use super::extract::{AppJson, AppPath, present};
use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse<T> {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<T>,
}

impl<T> CategoryResponse<T> {
    const fn new(message: &'static str, category: Option<T>) -> Self {
        Self {
            success: true,
            message,
            category,
        }
    }
}

fn category_name(name: Option<String>) -> Option<(String, std::result::Result<Slug, AppError>)> {
    present(name).map(|name| {
        let name = name.trim().to_owned();
        let slug = Slug::from_name(&name).map_err(|_| {
            AppError::BadRequest("Name must contain letters or digits".to_string())
        });
        (name, slug)
    })
}

fn category_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Category not found".to_string()),
        other => other.into(),
    }
}

/// `POST /create-category`
pub async fn create(
    State(state): State<AppState>,
    AppJson(body): AppJson<CategoryRequest>,
) -> Result<impl IntoResponse> {
    let Some((name, slug)) = category_name(body.name) else {
        return Err(AppError::Unauthorized("Name is required".to_string()));
    };

    if state.repos().categories.get_by_name(&name).await?.is_some() {
        return Ok((
            StatusCode::OK,
            AppJson(CategoryResponse::new("Category already exists", None)),
        ));
    }

    let category = state.repos().categories.create(&name, &slug?).await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");

    Ok((
        StatusCode::CREATED,
        AppJson(CategoryResponse::new("New category created", Some(category))),
    ))
}

/// `PUT /update-category/{id}`
pub async fn update(
    State(state): State<AppState>,
    AppPath(id): AppPath<CategoryId>,
    AppJson(body): AppJson<CategoryRequest>,
) -> Result<AppJson<CategoryResponse<Category>>> {
    let Some((name, slug)) = category_name(body.name) else {
        return Err(AppError::BadRequest("Name is required".to_string()));
    };

    let category = state
        .repos()
        .categories
        .update(id, &name, &slug?)
        .await
        .map_err(category_not_found)?;

    Ok(AppJson(CategoryResponse::new(
        "Category updated successfully",
        Some(category),
    )))
}

/// `GET /get-category`
pub async fn list(State(state): State<AppState>) -> Result<AppJson<CategoryResponse<Vec<Category>>>> {
    let categories = state.repos().categories.list().await?;
    Ok(AppJson(CategoryResponse::new(
        "All categories list",
        Some(categories),
    )))
}

/// `GET /single-category/{slug}`
pub async fn single(
    State(state): State<AppState>,
    AppPath(slug): AppPath<String>,
) -> Result<AppJson<CategoryResponse<Category>>> {
    let not_found = || AppError::NotFound("Category not found".to_string());
    let slug = Slug::parse(&slug).map_err(|_| not_found())?;
    let category = state
        .repos()
        .categories
        .get_by_slug(&slug)
        .await?
        .ok_or_else(not_found)?;

    Ok(AppJson(CategoryResponse::new(
        "Get single category successfully",
        Some(category),
    )))
}

/// `DELETE /delete-category/{id}`
pub async fn delete(
    State(state): State<AppState>,
    AppPath(id): AppPath<CategoryId>,
) -> Result<AppJson<CategoryResponse<()>>> {
    state
        .repos()
        .categories
        .delete(id)
        .await
        .map_err(category_not_found)?;

    tracing::info!(category_id = %id, "Category deleted");
    Ok(AppJson(CategoryResponse::new(
        "Category deleted successfully",
        None,
    )))
}
