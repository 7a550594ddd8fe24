//! Bazaar Server - storefront and back-office REST API.
//!
//! Serves `/api/v1` on `HOST:PORT` (default `127.0.0.1:8080`).
//!
//! # Storage
//!
//! `DATABASE_URL` selects the store: a `postgres://` URL, or `memory:` for a
//! throwaway in-process store (demos and local UI work).
//!
//! Migrations are NOT run on startup. Run them with `bazaar migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use bazaar_server::config::ServerConfig;
use bazaar_server::db::{self, Repositories};
use bazaar_server::services::auth::{AuthSettings, TokenSigner};
use bazaar_server::services::payment::{BraintreeGateway, DisabledGateway, PaymentGateway};
use bazaar_server::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_server=info,tower_http=debug".into());

    // JSON logs when LOG_FORMAT=json, text otherwise
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let repos = if config.uses_memory_store() {
        tracing::warn!("Using the in-memory store; data is lost on exit");
        Repositories::in_memory()
    } else {
        let pool = db::create_pool(&config.database_url)
            .await
            .expect("Failed to create database pool");
        tracing::info!("Database pool created");
        Repositories::postgres(pool)
    };

    let signer = TokenSigner::new(&config.jwt_secret, config.jwt_ttl);
    let auth = AuthSettings::new(signer).with_bcrypt_cost(config.bcrypt_cost);

    let payments: Arc<dyn PaymentGateway> = match &config.braintree {
        Some(braintree) => {
            tracing::info!(environment = ?braintree.environment, "Braintree gateway enabled");
            Arc::new(BraintreeGateway::new(braintree))
        }
        None => {
            tracing::warn!("BRAINTREE_MERCHANT_ID not set; checkout is disabled");
            Arc::new(DisabledGateway)
        }
    };

    let state = AppState::new(auth, repos, payments);
    let cors = bazaar_server::cors_layer(config.cors_origin.as_deref())
        .expect("CORS_ORIGIN is not a valid origin");
    let app = bazaar_server::app(state, cors);

    let addr = config.socket_addr();
    tracing::info!("bazaar listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
