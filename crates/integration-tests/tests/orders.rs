//! Checkout under `/api/v1/payment` and order management under `/api/v1/auth`.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use bazaar_core::Product;
use bazaar_integration_tests::{DECLINED_NONCE, FakeGateway, TestApp};
use bazaar_server::db::Repositories;
use bazaar_server::services::payment::{PaymentError, PaymentGateway, Transaction};

/// Cart lines the way the storefront sends them: whole product documents.
fn cart(products: &[&Product]) -> Value {
    Value::Array(
        products
            .iter()
            .map(|p| serde_json::to_value(p).unwrap())
            .collect(),
    )
}

async fn catalog(app: &TestApp) -> (Product, Product) {
    let book = app.seed_category("Book").await;
    let textbook = app
        .seed_product("Textbook", Decimal::new(7999, 2), book.id, None)
        .await;
    let novel = app
        .seed_product("Novel", Decimal::new(1450, 2), book.id, None)
        .await;
    (textbook, novel)
}

#[tokio::test]
async fn test_client_token_is_public() {
    let app = TestApp::new();
    let response = app.get("/api/v1/payment/braintree/token", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["clientToken"], "fake-client-token");
}

#[tokio::test]
async fn test_payment_requires_sign_in() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/v1/payment/braintree/payment",
            None,
            json!({ "nonce": "fake-valid-nonce", "cart": [] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(app.gateway.charges().is_empty());
}

#[tokio::test]
async fn test_payment_validation() {
    let app = TestApp::new();
    let token = app.buyer_token("buyer@bazaar.test").await;
    let (textbook, _) = catalog(&app).await;

    let no_nonce = app
        .post(
            "/api/v1/payment/braintree/payment",
            Some(&token),
            json!({ "cart": cart(&[&textbook]) }),
        )
        .await;
    assert_eq!(no_nonce.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_nonce.json()["message"], "Payment nonce is required");

    let empty = app
        .post(
            "/api/v1/payment/braintree/payment",
            Some(&token),
            json!({ "nonce": "fake-valid-nonce", "cart": [] }),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.json()["message"], "Cart is empty");

    let unknown = app
        .post(
            "/api/v1/payment/braintree/payment",
            Some(&token),
            json!({ "nonce": "fake-valid-nonce", "cart": [{ "_id": 9999 }] }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    assert!(app.gateway.charges().is_empty());
}

#[tokio::test]
async fn test_payment_charges_stored_prices_and_records_order() {
    let app = TestApp::new();
    let token = app.buyer_token("buyer@bazaar.test").await;
    let (textbook, novel) = catalog(&app).await;

    // A tampered client price must not change the charge.
    let mut lines = cart(&[&textbook, &novel, &novel]);
    lines[0]["price"] = json!(0.01);

    let response = app
        .post(
            "/api/v1/payment/braintree/payment",
            Some(&token),
            json!({ "nonce": "fake-valid-nonce", "cart": lines }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    assert_eq!(response.json()["ok"], true);

    let charges = app.gateway.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].0, "fake-valid-nonce");
    assert_eq!(charges[0].1, Decimal::new(7999 + 1450 * 2, 2));

    let orders = app.get("/api/v1/auth/orders", Some(&token)).await;
    assert_eq!(orders.status, StatusCode::OK);
    let orders = orders.json();
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order["status"], "Not Process");
    assert_eq!(order["buyer"]["name"], "Buyer");
    assert_eq!(order["products"].as_array().unwrap().len(), 3);
    assert_eq!(order["payment"]["id"], "txn-1");
}

#[tokio::test]
async fn test_declined_payment_places_no_order() {
    let app = TestApp::new();
    let token = app.buyer_token("buyer@bazaar.test").await;
    let (textbook, _) = catalog(&app).await;

    let response = app
        .post(
            "/api/v1/payment/braintree/payment",
            Some(&token),
            json!({ "nonce": DECLINED_NONCE, "cart": cart(&[&textbook]) }),
        )
        .await;
    assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(response.json()["success"], false);

    let orders = app.get("/api/v1/auth/orders", Some(&token)).await.json();
    assert!(orders.as_array().unwrap().is_empty());
}

/// Approves through [`FakeGateway`], then removes the whole catalog so the
/// order insert that follows fails.
struct CatalogWipingGateway {
    repos: Repositories,
    fake: Arc<FakeGateway>,
}

#[async_trait]
impl PaymentGateway for CatalogWipingGateway {
    async fn client_token(&self) -> Result<String, PaymentError> {
        self.fake.client_token().await
    }

    async fn charge(&self, nonce: &str, amount: Decimal) -> Result<Transaction, PaymentError> {
        let transaction = self.fake.charge(nonce, amount).await?;
        for product in self.repos.products.list_recent(100, 0).await.unwrap() {
            self.repos.products.delete(product.id).await.unwrap();
        }
        Ok(transaction)
    }
}

#[tokio::test]
async fn test_charged_but_unrecorded_order_is_server_error() {
    let app = TestApp::with_gateway(|repos, fake| Arc::new(CatalogWipingGateway { repos, fake }));
    let token = app.buyer_token("buyer@bazaar.test").await;
    let (textbook, _) = catalog(&app).await;

    let response = app
        .post(
            "/api/v1/payment/braintree/payment",
            Some(&token),
            json!({ "nonce": "fake-valid-nonce", "cart": cart(&[&textbook]) }),
        )
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["success"], false);

    let charges = app.gateway.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].1, Decimal::new(7999, 2));
    assert_eq!(app.repos().products.count().await.unwrap(), 0);

    let orders = app.get("/api/v1/auth/orders", Some(&token)).await;
    assert_eq!(orders.status, StatusCode::OK);
    assert!(orders.json().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_orders_are_per_buyer_and_all_orders_is_admin_only() {
    let app = TestApp::new();
    let alice = app.buyer_token("alice@bazaar.test").await;
    let bob = app.buyer_token("bob@bazaar.test").await;
    let admin = app.admin_token().await;
    let (textbook, novel) = catalog(&app).await;

    for (token, product) in [(&alice, &textbook), (&bob, &novel)] {
        let response = app
            .post(
                "/api/v1/payment/braintree/payment",
                Some(token),
                json!({ "nonce": "fake-valid-nonce", "cart": cart(&[product]) }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let mine = app.get("/api/v1/auth/orders", Some(&alice)).await.json();
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["products"][0]["name"], "Textbook");

    let denied = app.get("/api/v1/auth/all-orders", Some(&alice)).await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    let all = app.get("/api/v1/auth/all-orders", Some(&admin)).await.json();
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 2);
    // Newest first.
    assert_eq!(all[0]["products"][0]["name"], "Novel");
}

#[tokio::test]
async fn test_order_status_updates() {
    let app = TestApp::new();
    let buyer = app.buyer_token("buyer@bazaar.test").await;
    let admin = app.admin_token().await;
    let (textbook, _) = catalog(&app).await;

    app.post(
        "/api/v1/payment/braintree/payment",
        Some(&buyer),
        json!({ "nonce": "fake-valid-nonce", "cart": cart(&[&textbook]) }),
    )
    .await;
    let orders = app.get("/api/v1/auth/orders", Some(&buyer)).await.json();
    let order_id = orders[0]["_id"].clone();
    let uri = format!("/api/v1/auth/order-status/{order_id}");

    let shipped = app
        .put(&uri, Some(&admin), json!({ "status": "Shipped" }))
        .await;
    assert_eq!(shipped.status, StatusCode::OK);
    assert_eq!(shipped.json()["status"], "Shipped");

    let invalid = app
        .put(&uri, Some(&admin), json!({ "status": "delivered" }))
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let by_buyer = app
        .put(&uri, Some(&buyer), json!({ "status": "cancel" }))
        .await;
    assert_eq!(by_buyer.status, StatusCode::UNAUTHORIZED);

    let missing = app
        .put(
            "/api/v1/auth/order-status/9999",
            Some(&admin),
            json!({ "status": "Processing" }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let orders = app.get("/api/v1/auth/orders", Some(&buyer)).await.json();
    assert_eq!(orders[0]["status"], "Shipped");
}
