//! HTTP route handlers.
//!
//! # Route Structure
//!
//! Guards: `user` = valid session token, `admin` = token of a role-1 user.
//!
//! ```text
//! GET  /health                                  - Liveness
//! GET  /health/ready                            - Store reachable
//!
//! # Auth (/api/v1/auth)
//! POST /register, /login, /forgot-password
//! GET  /user-auth, /orders                      - user
//! PUT  /update-profile                          - user
//! GET  /test, /admin-auth, /all-orders          - admin
//! PUT  /order-status/{order_id}                 - admin
//!
//! # Category (/api/v1/category)
//! GET    /get-category, /single-category/{slug}
//! POST   /create-category                       - admin
//! PUT    /update-category/{id}                  - admin
//! DELETE /delete-category/{id}                  - admin
//!
//! # Product (/api/v1/product)
//! GET    /get-product, /get-product/{slug}, /product-photo/{pid}
//! GET    /product-count, /product-list/{page}, /search/{keyword}
//! GET    /related-product/{pid}/{cid}, /product-category/{slug}
//! POST   /product-filters
//! POST   /create-product                        - admin
//! PUT    /update-product/{pid}                  - admin
//! DELETE /delete-product/{pid}                  - admin
//!
//! # Payment (/api/v1/payment)
//! GET  /braintree/token
//! POST /braintree/payment                       - user
//! ```

pub mod auth;
pub mod categories;
pub mod extract;
pub mod payments;
pub mod products;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

use crate::middleware::{is_admin, require_sign_in};
use crate::state::AppState;

/// Put every route of `router` behind the sign-in guard.
fn signed_in(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router.route_layer(from_fn_with_state(state.clone(), require_sign_in))
}

/// Put every route of `router` behind sign-in, then the admin check.
///
/// The layer added last runs first.
fn admin_only(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .route_layer(from_fn_with_state(state.clone(), is_admin))
        .route_layer(from_fn_with_state(state.clone(), require_sign_in))
}

/// Create the auth routes router.
pub fn auth_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password));

    let user = Router::new()
        .route("/user-auth", get(auth::auth_ok))
        .route("/update-profile", put(auth::update_profile))
        .route("/orders", get(auth::orders));

    let admin = Router::new()
        .route("/test", get(auth::protected_test))
        .route("/admin-auth", get(auth::auth_ok))
        .route("/all-orders", get(auth::all_orders))
        .route("/order-status/{order_id}", put(auth::order_status));

    public
        .merge(signed_in(user, state))
        .merge(admin_only(admin, state))
}

/// Create the category routes router.
pub fn category_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/get-category", get(categories::list))
        .route("/single-category/{slug}", get(categories::single));

    let admin = Router::new()
        .route("/create-category", post(categories::create))
        .route("/update-category/{id}", put(categories::update))
        .route("/delete-category/{id}", delete(categories::delete));

    public.merge(admin_only(admin, state))
}

/// Create the product routes router.
pub fn product_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/get-product", get(products::list))
        .route("/get-product/{slug}", get(products::single))
        .route("/product-photo/{pid}", get(products::photo))
        .route("/product-filters", post(products::filter))
        .route("/product-count", get(products::count))
        .route("/product-list/{page}", get(products::page))
        .route("/search/{keyword}", get(products::search))
        .route("/related-product/{pid}/{cid}", get(products::related))
        .route("/product-category/{slug}", get(products::by_category));

    let admin = Router::new()
        .route("/create-product", post(products::create))
        .route("/update-product/{pid}", put(products::update))
        .route("/delete-product/{pid}", delete(products::delete))
        .layer(DefaultBodyLimit::max(products::MAX_UPLOAD_BYTES));

    public.merge(admin_only(admin, state))
}

/// Create the payment routes router.
pub fn payment_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new().route("/braintree/token", get(payments::client_token));
    let user = Router::new().route("/braintree/payment", post(payments::checkout));

    public.merge(signed_in(user, state))
}

/// Create all routes for the API, without outer layers.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/v1/auth", auth_routes(state))
        .nest("/api/v1/category", category_routes(state))
        .nest("/api/v1/product", product_routes(state))
        .nest("/api/v1/payment", payment_routes(state))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.repos().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
