//! Sign-in and admin guards.
//!
//! `require_sign_in` verifies the raw `Authorization` header value as a
//! session token (there is no `Bearer ` prefix) and stores the [`Claims`] in
//! request extensions. `is_admin` must run after it; without claims it fails
//! closed with 401.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::{Claims, TokenError};
use crate::state::AppState;

const UNAUTHORIZED_ACCESS: &str = "Unauthorized Access";

/// Reject requests without a valid session token.
///
/// # Errors
///
/// Returns `AppError::Token` (401) when the header is absent or the token
/// does not verify.
pub async fn require_sign_in(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .filter(|t| !t.is_empty())
        .ok_or(TokenError::Missing)?;

    let claims = state.auth().signer.verify(token)?;

    set_sentry_user(&claims.id);
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Reject signed-in users who are not admins.
///
/// # Errors
///
/// Returns 401 `"Unauthorized Access"` for non-admins, unknown users and
/// requests that skipped `require_sign_in`; a failed lookup is also 401.
pub async fn is_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(claims) = request.extensions().get::<Claims>().copied() else {
        tracing::warn!(path = %request.uri().path(), "Admin check ran without sign-in claims");
        return Err(AppError::Unauthorized(UNAUTHORIZED_ACCESS.to_string()));
    };

    let user = state
        .repos()
        .users
        .get_by_id(claims.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %claims.id, "Admin lookup failed");
            AppError::AdminCheck("user lookup failed".to_string())
        })?;

    match user {
        Some(user) if user.role.is_admin() => Ok(next.run(request).await),
        _ => {
            tracing::info!(user_id = %claims.id, "Rejected non-admin request");
            Err(AppError::Unauthorized(UNAUTHORIZED_ACCESS.to_string()))
        }
    }
}

/// Extractor for the claims of a signed-in caller.
///
/// Only usable on routes behind `require_sign_in`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .copied()
            .map(Self)
            .ok_or(AppError::Token(TokenError::Missing))
    }
}
