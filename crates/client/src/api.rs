//! Typed client for the `/api/v1` REST surface.
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_client::{ApiClient, Session};
//!
//! let mut session = Session::open_dir(".bazaar");
//! let api = ApiClient::new("http://127.0.0.1:8080")?
//!     .with_token(session.auth.token().map(str::to_owned));
//!
//! let page = api.product_page(1).await?;
//! session.cart.add(page[0].clone())?;
//! ```

use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, StatusCode, header::AUTHORIZATION, multipart};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use bazaar_core::{
    Category, CategoryId, Order, OrderId, OrderStatus, Product, ProductId, User, UserSummary,
};

use crate::error::ClientError;
use crate::session::AuthSession;

type Result<T> = std::result::Result<T, ClientError>;

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

/// Registration fields.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: String,
    pub dob: NaiveDate,
    pub answer: String,
}

/// Profile changes; `None` leaves a field as stored.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A photo to upload with a product.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Product fields for create and update.
#[derive(Debug, Clone)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: CategoryId,
    pub quantity: i32,
    pub shipping: Option<bool>,
    pub photo: Option<PhotoUpload>,
}

impl ProductForm {
    fn into_multipart(self) -> Result<multipart::Form> {
        let mut form = multipart::Form::new()
            .text("name", self.name)
            .text("description", self.description)
            .text("price", self.price.to_string())
            .text("category", self.category.to_string())
            .text("quantity", self.quantity.to_string());
        if let Some(shipping) = self.shipping {
            form = form.text("shipping", shipping.to_string());
        }
        if let Some(photo) = self.photo {
            let part = multipart::Part::bytes(photo.data)
                .file_name(photo.file_name)
                .mime_str(&photo.content_type)?;
            form = form.part("photo", part);
        }
        Ok(form)
    }
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordReset<'a> {
    email: &'a str,
    answer: &'a str,
    new_password: &'a str,
}

#[derive(Debug, Serialize)]
struct NameBody<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: OrderStatus,
}

#[derive(Debug, Serialize)]
struct FilterBody<'a> {
    checked: &'a [CategoryId],
    radio: Vec<Decimal>,
}

#[derive(Debug, Serialize)]
struct CartLine {
    #[serde(rename = "_id")]
    id: ProductId,
}

#[derive(Debug, Serialize)]
struct PaymentBody<'a> {
    nonce: &'a str,
    cart: Vec<CartLine>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    user: User,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    user: UserSummary,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatedUserBody {
    updated_user: User,
}

#[derive(Debug, Deserialize)]
struct OkBody {
    ok: bool,
}

#[derive(Debug, Deserialize)]
struct CategoryBody<T> {
    message: String,
    category: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SavedProductBody {
    products: Product,
}

#[derive(Debug, Deserialize)]
struct ProductBody {
    product: Product,
}

#[derive(Debug, Deserialize)]
struct ProductsBody {
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct CountBody {
    total: i64,
}

#[derive(Debug, Deserialize)]
struct CategoryProductsBody {
    category: Category,
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenBody {
    client_token: String,
}

/// Result of `create-category`: the server answers 200 without a category
/// when the name is taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryCreated {
    Created(Category),
    AlreadyExists,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Client for one Bazaar server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the server at `base_url` (scheme, host, port).
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token: None,
        })
    }

    /// Send `token` as the `Authorization` header on guarded routes.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join("api/v1/")?.join(path)?)
    }

    /// `url` for a route, with `segment` appended as one percent-encoded
    /// path segment.
    fn url_with(&self, path: &str, segment: &str) -> Result<Url> {
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(segment);
        Ok(url)
    }

    fn request_to(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            // Raw token, no `Bearer ` prefix
            Some(token) => builder.header(AUTHORIZATION, token),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.request_to(method, self.url(path)?))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        if self.token.is_none() {
            return Err(ClientError::NotSignedIn);
        }
        self.request(method, path)
    }

    async fn check(builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| fallback_message(status, &body));
        tracing::debug!(status = status.as_u16(), %message, "API request failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = Self::check(builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `ClientError::Api` with 400 for a missing field and 409 for a
    /// registered email.
    pub async fn register(&self, registration: &Registration) -> Result<User> {
        let body: UserBody =
            Self::send(self.request(Method::POST, "auth/register")?.json(registration)).await?;
        Ok(body.user)
    }

    /// Log in; the result is what [`AuthContext::sign_in`] stores.
    ///
    /// [`AuthContext::sign_in`]: crate::session::AuthContext::sign_in
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 for an unknown email and 401 for a
    /// wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let body: LoginBody = Self::send(
            self.request(Method::POST, "auth/login")?
                .json(&Credentials { email, password }),
        )
        .await?;
        Ok(AuthSession {
            user: body.user,
            token: body.token,
        })
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 when email and answer do not match.
    pub async fn forgot_password(
        &self,
        email: &str,
        answer: &str,
        new_password: &str,
    ) -> Result<String> {
        let body: MessageBody = Self::send(
            self.request(Method::POST, "auth/forgot-password")?
                .json(&PasswordReset {
                    email,
                    answer,
                    new_password,
                }),
        )
        .await?;
        Ok(body.message)
    }

    /// Whether the stored token is still accepted.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures; a rejected token is `Ok(false)`.
    pub async fn user_auth(&self) -> Result<bool> {
        self.probe("auth/user-auth").await
    }

    /// Whether the stored token belongs to an admin.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures; a rejection is `Ok(false)`.
    pub async fn admin_auth(&self) -> Result<bool> {
        self.probe("auth/admin-auth").await
    }

    async fn probe(&self, path: &str) -> Result<bool> {
        match Self::send::<OkBody>(self.authed(Method::GET, path)?).await {
            Ok(body) => Ok(body.ok),
            Err(ClientError::Api { status: 401, .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, or the API error.
    pub async fn update_profile(&self, changes: &ProfileChanges) -> Result<User> {
        let body: UpdatedUserBody =
            Self::send(self.authed(Method::PUT, "auth/update-profile")?.json(changes)).await?;
        Ok(body.updated_user)
    }

    /// The caller's orders.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, or the API error.
    pub async fn orders(&self) -> Result<Vec<Order>> {
        Self::send(self.authed(Method::GET, "auth/orders")?).await
    }

    /// Every order (admin).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, or the API error.
    pub async fn all_orders(&self) -> Result<Vec<Order>> {
        Self::send(self.authed(Method::GET, "auth/all-orders")?).await
    }

    /// Move an order to `status` (admin).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, or the API error.
    pub async fn update_order_status(&self, order: OrderId, status: OrderStatus) -> Result<Order> {
        Self::send(
            self.authed(Method::PUT, &format!("auth/order-status/{order}"))?
                .json(&StatusBody { status }),
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns the API error.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let body: CategoryBody<Vec<Category>> =
            Self::send(self.request(Method::GET, "category/get-category")?).await?;
        Ok(body.category.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 for an unknown slug.
    pub async fn category(&self, slug: &str) -> Result<Category> {
        let body: CategoryBody<Category> = Self::send(
            self.request_to(Method::GET, self.url_with("category/single-category", slug)?),
        )
        .await?;
        body.category.ok_or_else(|| missing_field("category"))
    }

    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, or the API error.
    pub async fn create_category(&self, name: &str) -> Result<CategoryCreated> {
        let body: CategoryBody<Category> = Self::send(
            self.authed(Method::POST, "category/create-category")?
                .json(&NameBody { name }),
        )
        .await?;
        Ok(match body.category {
            Some(category) => CategoryCreated::Created(category),
            None => {
                tracing::debug!(message = %body.message, "Category not created");
                CategoryCreated::AlreadyExists
            }
        })
    }

    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, or the API error.
    pub async fn update_category(&self, id: CategoryId, name: &str) -> Result<Category> {
        let body: CategoryBody<Category> = Self::send(
            self.authed(Method::PUT, &format!("category/update-category/{id}"))?
                .json(&NameBody { name }),
        )
        .await?;
        body.category.ok_or_else(|| missing_field("category"))
    }

    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, or the API error
    /// (409 while products still use the category).
    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let _: MessageBody = Self::send(
            self.authed(Method::DELETE, &format!("category/delete-category/{id}"))?,
        )
        .await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Products
    // ─────────────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, or the API error.
    pub async fn create_product(&self, form: ProductForm) -> Result<Product> {
        let body: SavedProductBody = Self::send(
            self.authed(Method::POST, "product/create-product")?
                .multipart(form.into_multipart()?),
        )
        .await?;
        Ok(body.products)
    }

    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, or the API error.
    pub async fn update_product(&self, id: ProductId, form: ProductForm) -> Result<Product> {
        let body: SavedProductBody = Self::send(
            self.authed(Method::PUT, &format!("product/update-product/{id}"))?
                .multipart(form.into_multipart()?),
        )
        .await?;
        Ok(body.products)
    }

    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, or the API error.
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        let _: MessageBody = Self::send(
            self.authed(Method::DELETE, &format!("product/delete-product/{id}"))?,
        )
        .await?;
        Ok(())
    }

    /// The twelve newest products.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    pub async fn products(&self) -> Result<Vec<Product>> {
        let body: ProductsBody =
            Self::send(self.request(Method::GET, "product/get-product")?).await?;
        Ok(body.products)
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 for an unknown slug.
    pub async fn product(&self, slug: &str) -> Result<Product> {
        let body: ProductBody =
            Self::send(self.request_to(Method::GET, self.url_with("product/get-product", slug)?))
                .await?;
        Ok(body.product)
    }

    /// Photo bytes and their content type.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 when there is no photo.
    pub async fn product_photo(&self, id: ProductId) -> Result<(String, Vec<u8>)> {
        let response =
            Self::check(self.request(Method::GET, &format!("product/product-photo/{id}"))?)
                .await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = response.bytes().await?;
        Ok((content_type, bytes.to_vec()))
    }

    /// Products in any of `categories` (all when empty), optionally within an
    /// inclusive price range.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    pub async fn filter_products(
        &self,
        categories: &[CategoryId],
        price: Option<(Decimal, Decimal)>,
    ) -> Result<Vec<Product>> {
        let radio = price.map_or_else(Vec::new, |(min, max)| vec![min, max]);
        let body: ProductsBody = Self::send(
            self.request(Method::POST, "product/product-filters")?
                .json(&FilterBody {
                    checked: categories,
                    radio,
                }),
        )
        .await?;
        Ok(body.products)
    }

    /// # Errors
    ///
    /// Returns the API error.
    pub async fn product_count(&self) -> Result<i64> {
        let body: CountBody =
            Self::send(self.request(Method::GET, "product/product-count")?).await?;
        Ok(body.total)
    }

    /// One page of six, newest first. Pages start at 1.
    ///
    /// # Errors
    ///
    /// Returns the API error.
    pub async fn product_page(&self, page: i64) -> Result<Vec<Product>> {
        let body: ProductsBody =
            Self::send(self.request(Method::GET, &format!("product/product-list/{page}"))?)
                .await?;
        Ok(body.products)
    }

    /// # Errors
    ///
    /// Returns the API error.
    pub async fn search(&self, keyword: &str) -> Result<Vec<Product>> {
        let url = self.url_with("product/search", keyword)?;
        Self::send(self.request_to(Method::GET, url)).await
    }

    /// # Errors
    ///
    /// Returns the API error.
    pub async fn related_products(
        &self,
        product: ProductId,
        category: CategoryId,
    ) -> Result<Vec<Product>> {
        let body: ProductsBody = Self::send(self.request(
            Method::GET,
            &format!("product/related-product/{product}/{category}"),
        )?)
        .await?;
        Ok(body.products)
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 for an unknown slug.
    pub async fn products_in_category(&self, slug: &str) -> Result<(Category, Vec<Product>)> {
        let body: CategoryProductsBody = Self::send(
            self.request_to(Method::GET, self.url_with("product/product-category", slug)?),
        )
        .await?;
        Ok((body.category, body.products))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payment
    // ─────────────────────────────────────────────────────────────────────────

    /// Token for the gateway's browser drop-in.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 502 when the gateway is unavailable.
    pub async fn client_token(&self) -> Result<String> {
        let body: ClientTokenBody =
            Self::send(self.request(Method::GET, "payment/braintree/token")?).await?;
        Ok(body.client_token)
    }

    /// Charge `nonce` for the products in `cart` and place the order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn` without a token, `ClientError::Api`
    /// with 402 for a declined payment, or another API error.
    pub async fn checkout(&self, nonce: &str, cart: &[ProductId]) -> Result<()> {
        let cart = cart.iter().map(|&id| CartLine { id }).collect();
        let body: OkBody = Self::send(
            self.authed(Method::POST, "payment/braintree/payment")?
                .json(&PaymentBody { nonce, cart }),
        )
        .await?;
        if body.ok {
            Ok(())
        } else {
            Err(missing_field("ok"))
        }
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_owned()
    } else {
        body.trim().to_owned()
    }
}

const fn missing_field(field: &'static str) -> ClientError {
    ClientError::UnexpectedResponse(field)
}
