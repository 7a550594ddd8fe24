//! Category administration and lookup under `/api/v1/category`.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use bazaar_integration_tests::TestApp;

#[tokio::test]
async fn test_create_category_requires_admin() {
    let app = TestApp::new();
    let buyer = app.buyer_token("buyer@bazaar.test").await;

    let response = app
        .post(
            "/api/v1/category/create-category",
            Some(&buyer),
            json!({ "name": "Book" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(app.repos().categories.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_category() {
    let app = TestApp::new();
    let admin = app.admin_token().await;

    let created = app
        .post(
            "/api/v1/category/create-category",
            Some(&admin),
            json!({ "name": "Home Garden" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let body = created.json();
    assert_eq!(body["message"], "New category created");
    assert_eq!(body["category"]["name"], "Home Garden");
    assert_eq!(body["category"]["slug"], "Home-Garden");

    let again = app
        .post(
            "/api/v1/category/create-category",
            Some(&admin),
            json!({ "name": "Home Garden" }),
        )
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.json()["message"], "Category already exists");

    let nameless = app
        .post("/api/v1/category/create-category", Some(&admin), json!({}))
        .await;
    assert_eq!(nameless.status, StatusCode::UNAUTHORIZED);
    assert_eq!(nameless.json()["message"], "Name is required");
}

#[tokio::test]
async fn test_update_category() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let book = app.seed_category("Book").await;

    let uri = format!("/api/v1/category/update-category/{}", book.id);
    let response = app.put(&uri, Some(&admin), json!({ "name": "Books" })).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["category"]["name"], "Books");
    assert_eq!(body["category"]["slug"], "Books");

    let unknown = app
        .put(
            "/api/v1/category/update-category/9999",
            Some(&admin),
            json!({ "name": "Ghost" }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let bad_id = app
        .put(
            "/api/v1/category/update-category/abc",
            Some(&admin),
            json!({ "name": "Ghost" }),
        )
        .await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_and_single_category() {
    let app = TestApp::new();
    app.seed_category("Book").await;
    app.seed_category("Electronics").await;

    let list = app.get("/api/v1/category/get-category", None).await;
    assert_eq!(list.status, StatusCode::OK);
    let body = list.json();
    assert_eq!(body["message"], "All categories list");
    assert_eq!(body["category"].as_array().unwrap().len(), 2);

    let single = app
        .get("/api/v1/category/single-category/Electronics", None)
        .await;
    assert_eq!(single.status, StatusCode::OK);
    assert_eq!(single.json()["category"]["name"], "Electronics");

    let missing = app.get("/api/v1/category/single-category/Toys", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_category() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let empty = app.seed_category("Empty").await;

    let uri = format!("/api/v1/category/delete-category/{}", empty.id);
    let response = app.delete(&uri, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["message"], "Category deleted successfully");
    assert!(app.repos().categories.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_category_in_use_conflicts() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let book = app.seed_category("Book").await;
    app.seed_product("Textbook", Decimal::new(7999, 2), book.id, None)
        .await;

    let uri = format!("/api/v1/category/delete-category/{}", book.id);
    let response = app.delete(&uri, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(app.repos().categories.list().await.unwrap().len(), 1);
}
