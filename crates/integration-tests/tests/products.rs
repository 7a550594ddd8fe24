//! Catalog administration and browsing under `/api/v1/product`.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use bazaar_integration_tests::{FilePart, TestApp};
use bazaar_server::models::ProductPhoto;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn names(products: &Value) -> Vec<String> {
    products
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_create_product_with_photo() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let book = app.seed_category("Book").await;
    let category = book.id.to_string();

    let photo = FilePart {
        name: "photo",
        file_name: "cover.png",
        content_type: "image/png",
        data: PNG,
    };
    let response = app
        .multipart(
            Method::POST,
            "/api/v1/product/create-product",
            Some(&admin),
            &[
                ("name", "Data Structures 101"),
                ("description", "A comprehensive textbook"),
                ("price", "79.99"),
                ("category", &category),
                ("quantity", "50"),
                ("shipping", "true"),
            ],
            Some(&photo),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    let body = response.json();
    assert_eq!(body["message"], "Product created successfully");
    let product = &body["products"];
    assert_eq!(product["slug"], "Data-Structures-101");
    assert_eq!(product["price"], 79.99);
    assert_eq!(product["category"]["name"], "Book");
    assert_eq!(product["hasPhoto"], true);
    assert!(product.get("photo").is_none());

    let uri = format!("/api/v1/product/product-photo/{}", product["_id"]);
    let photo = app.get(&uri, None).await;
    assert_eq!(photo.status, StatusCode::OK);
    assert_eq!(photo.headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(photo.bytes, PNG);
}

#[tokio::test]
async fn test_create_product_validation() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let book = app.seed_category("Book").await;
    let category = book.id.to_string();

    let missing = app
        .multipart(
            Method::POST,
            "/api/v1/product/create-product",
            Some(&admin),
            &[("name", "Textbook"), ("price", "10"), ("category", &category)],
            None,
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.json()["message"], "Description is required");

    let big = vec![0_u8; 1_000_001];
    let photo = FilePart {
        name: "photo",
        file_name: "huge.jpg",
        content_type: "image/jpeg",
        data: &big,
    };
    let oversized = app
        .multipart(
            Method::POST,
            "/api/v1/product/create-product",
            Some(&admin),
            &[
                ("name", "Textbook"),
                ("description", "Thick"),
                ("price", "10"),
                ("category", &category),
                ("quantity", "1"),
            ],
            Some(&photo),
        )
        .await;
    assert_eq!(oversized.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        oversized.json()["message"],
        "Photo is required and should be less than 1mb"
    );

    let unknown_category = app
        .multipart(
            Method::POST,
            "/api/v1/product/create-product",
            Some(&admin),
            &[
                ("name", "Textbook"),
                ("description", "Thick"),
                ("price", "10"),
                ("category", "9999"),
                ("quantity", "1"),
            ],
            None,
        )
        .await;
    assert_eq!(unknown_category.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown_category.json()["message"], "Category not found");
}

#[tokio::test]
async fn test_photo_over_default_body_limit_gets_photo_message() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let book = app.seed_category("Book").await;
    let category = book.id.to_string();

    // Past axum's 2 MB default, and past the upload route limit.
    for size in [2_500_000, 17 * 1024 * 1024] {
        let big = vec![0_u8; size];
        let photo = FilePart {
            name: "photo",
            file_name: "huge.jpg",
            content_type: "image/jpeg",
            data: &big,
        };
        let response = app
            .multipart(
                Method::POST,
                "/api/v1/product/create-product",
                Some(&admin),
                &[
                    ("name", "Textbook"),
                    ("description", "Thick"),
                    ("price", "10"),
                    ("category", &category),
                    ("quantity", "1"),
                ],
                Some(&photo),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "size {size}");
        assert_eq!(
            response.json()["message"],
            "Photo is required and should be less than 1mb",
            "size {size}"
        );
    }
    assert_eq!(app.repos().products.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_product_requires_admin() {
    let app = TestApp::new();
    let buyer = app.buyer_token("buyer@bazaar.test").await;

    let response = app
        .multipart(
            Method::POST,
            "/api/v1/product/create-product",
            Some(&buyer),
            &[("name", "Textbook")],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.repos().products.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_update_keeps_photo_when_none_sent() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let book = app.seed_category("Book").await;
    let photo = ProductPhoto {
        data: PNG.to_vec(),
        content_type: "image/png".to_string(),
    };
    let product = app
        .seed_product("Textbook", Decimal::new(7999, 2), book.id, Some(photo))
        .await;
    let category = book.id.to_string();

    let uri = format!("/api/v1/product/update-product/{}", product.id);
    let response = app
        .multipart(
            Method::PUT,
            &uri,
            Some(&admin),
            &[
                ("name", "Textbook Second Edition"),
                ("description", "Revised"),
                ("price", "89.5"),
                ("category", &category),
                ("quantity", "20"),
            ],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    let body = response.json();
    assert_eq!(body["products"]["slug"], "Textbook-Second-Edition");
    assert_eq!(body["products"]["price"], 89.5);

    let stored = app.repos().products.photo(product.id).await.unwrap();
    assert_eq!(stored.unwrap().data, PNG);
}

#[tokio::test]
async fn test_single_product_and_delete() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let book = app.seed_category("Book").await;
    let product = app
        .seed_product("Novel", Decimal::new(1499, 2), book.id, None)
        .await;

    let single = app.get("/api/v1/product/get-product/Novel", None).await;
    assert_eq!(single.status, StatusCode::OK);
    assert_eq!(single.json()["product"]["name"], "Novel");

    let no_photo = app
        .get(&format!("/api/v1/product/product-photo/{}", product.id), None)
        .await;
    assert_eq!(no_photo.status, StatusCode::NOT_FOUND);

    let uri = format!("/api/v1/product/delete-product/{}", product.id);
    let deleted = app.delete(&uri, Some(&admin)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.json()["message"], "Product deleted successfully");

    let gone = app.get("/api/v1/product/get-product/Novel", None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, Some(&admin)).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pagination_newest_first() {
    let app = TestApp::new();
    let book = app.seed_category("Book").await;
    for i in 1..=10 {
        app.seed_product(&format!("Item {i}"), Decimal::from(i), book.id, None)
            .await;
    }

    let count = app.get("/api/v1/product/product-count", None).await;
    assert_eq!(count.json()["total"], 10);

    let first = app.get("/api/v1/product/product-list/1", None).await.json();
    assert_eq!(
        names(&first["products"]),
        ["Item 10", "Item 9", "Item 8", "Item 7", "Item 6", "Item 5"]
    );

    let second = app.get("/api/v1/product/product-list/2", None).await.json();
    assert_eq!(
        names(&second["products"]),
        ["Item 4", "Item 3", "Item 2", "Item 1"]
    );

    let zero = app.get("/api/v1/product/product-list/0", None).await.json();
    assert_eq!(zero["products"], first["products"]);

    let home = app.get("/api/v1/product/get-product", None).await.json();
    assert_eq!(home["countTotal"], 10);
}

#[tokio::test]
async fn test_filters() {
    let app = TestApp::new();
    let book = app.seed_category("Book").await;
    let toys = app.seed_category("Toys").await;
    app.seed_product("Cheap Book", Decimal::new(999, 2), book.id, None)
        .await;
    app.seed_product("Dear Book", Decimal::new(12000, 2), book.id, None)
        .await;
    app.seed_product("Yo-yo", Decimal::new(500, 2), toys.id, None)
        .await;

    let by_category = app
        .post(
            "/api/v1/product/product-filters",
            None,
            json!({ "checked": [book.id], "radio": [] }),
        )
        .await;
    assert_eq!(by_category.status, StatusCode::OK);
    assert_eq!(
        names(&by_category.json()["products"]),
        ["Dear Book", "Cheap Book"]
    );

    let by_price = app
        .post(
            "/api/v1/product/product-filters",
            None,
            json!({ "checked": [], "radio": [0, 19.99] }),
        )
        .await;
    assert_eq!(names(&by_price.json()["products"]), ["Yo-yo", "Cheap Book"]);

    let both = app
        .post(
            "/api/v1/product/product-filters",
            None,
            json!({ "checked": [toys.id], "radio": [100, 200] }),
        )
        .await;
    assert!(both.json()["products"].as_array().unwrap().is_empty());

    let bad_range = app
        .post(
            "/api/v1/product/product-filters",
            None,
            json!({ "checked": [], "radio": [1] }),
        )
        .await;
    assert_eq!(bad_range.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_related_and_category_listing() {
    let app = TestApp::new();
    let book = app.seed_category("Book").await;
    let toys = app.seed_category("Toys").await;
    let textbook = app
        .seed_product("Textbook", Decimal::new(7999, 2), book.id, None)
        .await;
    app.seed_product("Novel", Decimal::new(1499, 2), book.id, None)
        .await;
    app.seed_product("Yo-yo", Decimal::new(500, 2), toys.id, None)
        .await;

    // Case-insensitive over name and description.
    let search = app.get("/api/v1/product/search/TEXT", None).await;
    assert_eq!(search.status, StatusCode::OK);
    assert_eq!(names(&search.json()), ["Textbook"]);
    let by_description = app.get("/api/v1/product/search/about%20yo", None).await;
    assert_eq!(names(&by_description.json()), ["Yo-yo"]);

    let uri = format!("/api/v1/product/related-product/{}/{}", textbook.id, book.id);
    let related = app.get(&uri, None).await;
    assert_eq!(names(&related.json()["products"]), ["Novel"]);

    let listing = app.get("/api/v1/product/product-category/Book", None).await;
    let body = listing.json();
    assert_eq!(body["category"]["name"], "Book");
    assert_eq!(names(&body["products"]), ["Novel", "Textbook"]);

    let unknown = app.get("/api/v1/product/product-category/Garden", None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}
