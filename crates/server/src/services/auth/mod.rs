//! Authentication helpers.
//!
//! Passwords are hashed with bcrypt. Sessions are stateless HS256 JWTs whose
//! payload is `{ "_id", "iat", "exp" }`; clients send the raw token in the
//! `Authorization` header.

mod error;

pub use error::{PasswordError, TokenError};

use std::fmt;

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use bazaar_core::UserId;

/// Default session lifetime in days.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

/// Minimum length for a password set through profile update.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Decoded token payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    /// Create a signer for `secret` whose tokens live for `ttl`.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: TimeDelta) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }

    /// Issue a token for a user.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue(&self, id: UserId) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        tracing::debug!(user_id = %id, ttl_secs = self.ttl.num_seconds(), "Issuing session token");

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Encoding)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::InvalidSignature` or
    /// `TokenError::Malformed` depending on why the token was rejected.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

/// Everything handlers need to authenticate users.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub signer: TokenSigner,
    pub bcrypt_cost: u32,
}

impl AuthSettings {
    /// Settings with the default bcrypt cost.
    #[must_use]
    pub fn new(signer: TokenSigner) -> Self {
        Self {
            signer,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Override the bcrypt cost (tests use the minimum).
    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Hash a password at the configured cost.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::Hash` if bcrypt fails.
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        hash_password(password, self.bcrypt_cost)
    }
}

/// Hash a password with bcrypt.
///
/// # Errors
///
/// Returns `PasswordError::Hash` if the cost is out of range.
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Check a password against a stored bcrypt hash.
///
/// # Errors
///
/// Returns `PasswordError::Hash` if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    Ok(bcrypt::verify(password, hash)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer(secret: &str, ttl: TimeDelta) -> TokenSigner {
        TokenSigner::new(&SecretString::from(secret.to_owned()), ttl)
    }

    #[test]
    fn test_token_roundtrip_carries_user_id() {
        let signer = signer("k8Jq2vXw9RtLm4Np", TimeDelta::days(DEFAULT_TOKEN_TTL_DAYS));
        let token = signer.issue(UserId::new(42)).unwrap();

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.id, UserId::new(42));
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_payload_uses_underscore_id() {
        let claims = Claims {
            id: UserId::new(7),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(claims).unwrap();
        assert_eq!(json["_id"], 7);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = signer("first-secret-value", TimeDelta::days(1))
            .issue(UserId::new(1))
            .unwrap();
        let err = signer("other-secret-value", TimeDelta::days(1))
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidSignature));
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer("k8Jq2vXw9RtLm4Np", TimeDelta::hours(-1));
        let token = signer.issue(UserId::new(1)).unwrap();
        assert!(matches!(signer.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let signer = signer("k8Jq2vXw9RtLm4Np", TimeDelta::days(1));
        assert!(matches!(
            signer.verify("invalid.token.here"),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            signer.verify("Bearer abc"),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("1234", 4).unwrap();
        assert_ne!(hash, "1234");
        assert!(verify_password("1234", &hash).unwrap());
        assert!(!verify_password("12345", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("1234", "not-a-bcrypt-hash").is_err());
    }
}
