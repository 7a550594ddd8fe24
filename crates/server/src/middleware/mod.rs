//! HTTP middleware.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded into the span)
//! 4. CORS
//! 5. Route guards: `require_sign_in`, then `is_admin`

pub mod auth;
pub mod request_id;

pub use auth::{AuthUser, is_admin, require_sign_in};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
