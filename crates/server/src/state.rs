//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::Repositories;
use crate::services::auth::AuthSettings;
use crate::services::payment::PaymentGateway;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    auth: AuthSettings,
    repos: Repositories,
    payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(auth: AuthSettings, repos: Repositories, payments: Arc<dyn PaymentGateway>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                auth,
                repos,
                payments,
            }),
        }
    }

    /// Token signer and password settings.
    #[must_use]
    pub fn auth(&self) -> &AuthSettings {
        &self.inner.auth
    }

    /// The repositories backing this server.
    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.repos
    }

    /// The payment gateway.
    #[must_use]
    pub fn payments(&self) -> &dyn PaymentGateway {
        self.inner.payments.as_ref()
    }
}
