//! Bazaar Server - REST API for the storefront and back-office.
//!
//! This crate provides the server as a library so the binary, the CLI and
//! the integration tests build the same router.
//!
//! # Architecture
//!
//! - Axum handlers under `/api/v1`, JSON in and out
//! - Repository traits with `PostgreSQL` and in-memory implementations
//! - HS256 session tokens in the raw `Authorization` header
//! - Braintree GraphQL API for checkout

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, header::InvalidHeaderValue},
    middleware::from_fn,
};
use sqlx::migrate::Migrator;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Schema migrations for the `PostgreSQL` store.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// CORS for the storefront SPA: one allowed origin, or any when unset.
///
/// # Errors
///
/// Returns an error if `origin` is not a valid header value.
pub fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(match origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(HeaderValue::from_str(origin)?)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        None => CorsLayer::permissive(),
    })
}

/// Build the full application: routes, tracing, request IDs, CORS and Sentry.
pub fn app(state: AppState, cors: CorsLayer) -> Router {
    routes::routes(&state)
        .layer(cors)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_rejects_bad_origin() {
        assert!(cors_layer(Some("https://shop.example.com")).is_ok());
        assert!(cors_layer(None).is_ok());
        assert!(cors_layer(Some("bad\norigin")).is_err());
    }
}
