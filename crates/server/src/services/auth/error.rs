//! Password and token error types.

use thiserror::Error;

/// Errors from hashing or checking a password.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// bcrypt rejected the input or the stored hash is malformed.
    #[error("password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Errors from issuing or verifying a session token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The request carried no token.
    #[error("token missing")]
    Missing,

    /// The token's `exp` claim is in the past.
    #[error("jwt expired")]
    Expired,

    /// The signature does not match the configured secret.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token is not a well-formed JWT with the expected claims.
    #[error("jwt malformed")]
    Malformed,

    /// Encoding a fresh token failed.
    #[error("token encoding failed: {0}")]
    Encoding(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::Malformed,
        }
    }
}
