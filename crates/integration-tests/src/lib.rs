//! Integration tests for Bazaar.
//!
//! Every test drives the real router (all layers included) with
//! `tower::ServiceExt::oneshot` over the in-memory repositories and a
//! [`FakeGateway`], so no database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::TimeDelta;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use bazaar_core::{Category, CategoryId, Email, Product, Role, Slug};
use bazaar_server::db::Repositories;
use bazaar_server::models::{ProductInput, ProductPhoto};
use bazaar_server::services::auth::{AuthSettings, TokenSigner};
use bazaar_server::services::payment::{PaymentError, PaymentGateway, Transaction};
use bazaar_server::state::AppState;

/// Signing secret for test tokens.
pub const TEST_SECRET: &str = "k3Y9vQ2mX7pL4sT8wR1zN6bH5cJ0dF2gA9eU3iO7yK4";

/// Nonce the fake gateway declines.
pub const DECLINED_NONCE: &str = "fake-processor-declined-visa-nonce";

// =============================================================================
// Fake Payment Gateway
// =============================================================================

/// Records charges; declines [`DECLINED_NONCE`], approves anything else.
#[derive(Debug, Default)]
pub struct FakeGateway {
    charges: Mutex<Vec<(String, Decimal)>>,
}

impl FakeGateway {
    /// Every `(nonce, amount)` charged so far, declined ones included.
    pub fn charges(&self) -> Vec<(String, Decimal)> {
        self.charges.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn client_token(&self) -> Result<String, PaymentError> {
        Ok("fake-client-token".to_string())
    }

    async fn charge(&self, nonce: &str, amount: Decimal) -> Result<Transaction, PaymentError> {
        let id = {
            let mut charges = self.charges.lock().unwrap();
            charges.push((nonce.to_string(), amount));
            format!("txn-{}", charges.len())
        };
        if nonce == DECLINED_NONCE {
            return Err(PaymentError::Declined("Processor Declined".to_string()));
        }
        Ok(Transaction {
            id: id.clone(),
            status: "SUBMITTED_FOR_SETTLEMENT".to_string(),
            raw: json!({
                "id": id,
                "status": "SUBMITTED_FOR_SETTLEMENT",
                "amount": { "value": format!("{amount:.2}"), "currencyCode": "USD" },
            }),
        })
    }
}

// =============================================================================
// Test Application
// =============================================================================

/// A response with its body read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    /// Body parsed as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes)
            .unwrap_or_else(|e| panic!("body is not JSON ({e}): {:?}", self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// A file field for [`TestApp::multipart`].
pub struct FilePart<'a> {
    pub name: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

const BOUNDARY: &str = "bazaar-test-boundary";

fn multipart_body(fields: &[(&str, &str)], file: Option<&FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.name, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// The full application over fresh in-memory state.
pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_gateway(|_, fake| fake)
    }

    /// Like [`TestApp::new`], with the gateway the router sees built by
    /// `wrap` from the app's repositories and the recording [`FakeGateway`].
    pub fn with_gateway(
        wrap: impl FnOnce(Repositories, Arc<FakeGateway>) -> Arc<dyn PaymentGateway>,
    ) -> Self {
        let signer = TokenSigner::new(&SecretString::from(TEST_SECRET), TimeDelta::days(7));
        // Minimum bcrypt cost keeps the suite fast
        let auth = AuthSettings::new(signer).with_bcrypt_cost(4);
        let gateway = Arc::new(FakeGateway::default());
        let repos = Repositories::in_memory();
        let payments = wrap(repos.clone(), gateway.clone());
        let state = AppState::new(auth, repos, payments);
        let cors = bazaar_server::cors_layer(None).unwrap();
        let router = bazaar_server::app(state.clone(), cors);
        Self {
            state,
            gateway,
            router,
        }
    }

    pub fn repos(&self) -> &Repositories {
        self.state.repos()
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            bytes: bytes.to_vec(),
        }
    }

    /// Send a request with an optional raw token and optional JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, token);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Send a `multipart/form-data` request.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        file: Option<&FilePart<'_>>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, token);
        }
        let request = builder
            .body(Body::from(multipart_body(fields, file)))
            .unwrap();
        self.send(request).await
    }

    // -------------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------------

    /// Registration body with every field filled in.
    pub fn registration(name: &str, email: &str, password: &str) -> Value {
        json!({
            "name": name,
            "email": email,
            "password": password,
            "phone": "1234",
            "address": "1234",
            "answer": "football",
            "dob": "2000-01-01",
        })
    }

    /// Register through the API; panics unless 201.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let response = self
            .post(
                "/api/v1/auth/register",
                None,
                Self::registration(name, email, password),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.json()
    }

    /// Log in through the API and return the token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/v1/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
        response.json()["token"].as_str().unwrap().to_string()
    }

    /// Token of a freshly registered buyer.
    pub async fn buyer_token(&self, email: &str) -> String {
        self.register("Buyer", email, "buyer-pass").await;
        self.login(email, "buyer-pass").await
    }

    /// Token of a freshly registered user promoted to admin.
    pub async fn admin_token(&self) -> String {
        let email = "admin@bazaar.test";
        let body = self.register("Admin", email, "admin-pass").await;
        let id = serde_json::from_value(body["user"]["_id"].clone()).unwrap();
        self.repos().users.set_role(id, Role::Admin).await.unwrap();
        self.login(email, "admin-pass").await
    }

    /// Insert a category directly.
    pub async fn seed_category(&self, name: &str) -> Category {
        self.repos()
            .categories
            .create(name, &Slug::from_name(name).unwrap())
            .await
            .unwrap()
    }

    /// Insert a product directly.
    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        category: CategoryId,
        photo: Option<ProductPhoto>,
    ) -> Product {
        self.repos()
            .products
            .create(&ProductInput {
                name: name.to_string(),
                slug: Slug::from_name(name).unwrap(),
                description: format!("About {name}"),
                price,
                category_id: category,
                quantity: 10,
                shipping: Some(true),
                photo,
            })
            .await
            .unwrap()
    }

    /// Stored bcrypt hash for `email`.
    pub async fn password_hash(&self, email: &str) -> String {
        let email = Email::parse(email).unwrap();
        let (_, hash) = self
            .repos()
            .users
            .get_password_hash(&email)
            .await
            .unwrap()
            .unwrap();
        hash
    }
}
