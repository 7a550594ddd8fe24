//! Extractors whose rejections render as [`AppError`] JSON.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

/// `Json` with a 400 `{success:false,...}` rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

/// `Path` with a 400 `{success:false,...}` rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Treat absent and empty strings alike.
pub fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A required text field, or 400 `"<label> is required"`.
///
/// # Errors
///
/// Returns `AppError::BadRequest` when the field is absent or blank.
pub fn required(value: Option<String>, label: &str) -> Result<String, AppError> {
    present(value).ok_or_else(|| AppError::BadRequest(format!("{label} is required")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_blank() {
        assert_eq!(required(Some("abc".to_string()), "Name").unwrap(), "abc");

        let err = required(Some("   ".to_string()), "Name").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Name is required"));
        assert!(required(None, "Email").is_err());
    }
}
