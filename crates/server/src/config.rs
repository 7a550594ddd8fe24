//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string, or `memory:` for the
//!   in-process store
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 8080)
//! - `JWT_TTL_DAYS` - Token lifetime in days (default: 7)
//! - `BCRYPT_COST` - bcrypt work factor, 4 to 31 (default: 12)
//! - `CORS_ORIGIN` - Allowed browser origin (default: any)
//! - `BRAINTREE_ENVIRONMENT` - `sandbox` or `production` (default: sandbox)
//! - `BRAINTREE_MERCHANT_ID` - Enables payments; when set the two keys below
//!   are required
//! - `BRAINTREE_PUBLIC_KEY` - API public key
//! - `BRAINTREE_PRIVATE_KEY` - API private key
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use chrono::TimeDelta;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::services::auth::DEFAULT_TOKEN_TTL_DAYS;

/// `DATABASE_URL` value selecting the in-memory store.
pub const MEMORY_DATABASE_URL: &str = "memory:";

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing secret
    pub jwt_secret: SecretString,
    /// Token lifetime
    pub jwt_ttl: TimeDelta,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
    /// Allowed CORS origin; `None` allows any
    pub cors_origin: Option<String>,
    /// Payment gateway credentials; `None` disables checkout
    pub braintree: Option<BraintreeConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Which Braintree API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraintreeEnvironment {
    Sandbox,
    Production,
}

impl BraintreeEnvironment {
    /// The GraphQL endpoint for this environment.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Sandbox => "https://payments.sandbox.braintree-api.com/graphql",
            Self::Production => "https://payments.braintree-api.com/graphql",
        }
    }
}

impl FromStr for BraintreeEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(format!("expected sandbox or production, got {other}")),
        }
    }
}

/// Braintree API credentials.
///
/// Implements `Debug` manually to redact the private key.
#[derive(Clone)]
pub struct BraintreeConfig {
    pub environment: BraintreeEnvironment,
    pub merchant_id: String,
    pub public_key: String,
    pub private_key: SecretString,
}

impl fmt::Debug for BraintreeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BraintreeConfig")
            .field("environment", &self.environment)
            .field("merchant_id", &self.merchant_id)
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let host = parse_env("HOST", "127.0.0.1")?;
        let port = parse_env("PORT", "8080")?;

        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET")?;

        let ttl_days: i64 = parse_env("JWT_TTL_DAYS", &DEFAULT_TOKEN_TTL_DAYS.to_string())?;
        let jwt_ttl = TimeDelta::try_days(ttl_days)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "JWT_TTL_DAYS".to_string(),
                    format!("{ttl_days} is not a usable number of days"),
                )
            })?;

        let bcrypt_cost: u32 = parse_env("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidEnvVar(
                "BCRYPT_COST".to_string(),
                format!("{bcrypt_cost} is outside 4..=31"),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_ttl,
            bcrypt_cost,
            cors_origin: get_optional_env("CORS_ORIGIN"),
            braintree: BraintreeConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether `DATABASE_URL` selects the in-memory store.
    #[must_use]
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.expose_secret() == MEMORY_DATABASE_URL
    }
}

impl BraintreeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(merchant_id) = get_optional_env("BRAINTREE_MERCHANT_ID") else {
            return Ok(None);
        };

        Ok(Some(Self {
            environment: parse_env("BRAINTREE_ENVIRONMENT", "sandbox")?,
            merchant_id,
            public_key: get_required_env("BRAINTREE_PUBLIC_KEY")?,
            private_key: get_validated_secret("BRAINTREE_PRIVATE_KEY")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(database_url: &str) -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from(database_url.to_owned()),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            jwt_secret: SecretString::from("x".repeat(32)),
            jwt_ttl: TimeDelta::days(7),
            bcrypt_cost: 4,
            cors_origin: None,
            braintree: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let err = validate_secret_strength("your-jwt-key-here", "JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("changeme123", "JWT_SECRET").is_err());
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "JWT_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_random_secret_accepted() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let secret = SecretString::from("aB3$xY9!");
        assert!(validate_secret_length(&secret, "JWT_SECRET").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = config("postgres://localhost/bazaar").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_memory_store_selection() {
        assert!(config("memory:").uses_memory_store());
        assert!(!config("postgres://localhost/bazaar").uses_memory_store());
    }

    #[test]
    fn test_braintree_environment_parse() {
        assert_eq!(
            "Sandbox".parse::<BraintreeEnvironment>().unwrap(),
            BraintreeEnvironment::Sandbox
        );
        assert_eq!(
            "production".parse::<BraintreeEnvironment>().unwrap().endpoint(),
            "https://payments.braintree-api.com/graphql"
        );
        assert!("staging".parse::<BraintreeEnvironment>().is_err());
    }

    #[test]
    fn test_braintree_config_debug_redacts_private_key() {
        let config = BraintreeConfig {
            environment: BraintreeEnvironment::Sandbox,
            merchant_id: "merchant_value".to_string(),
            public_key: "public_value".to_string(),
            private_key: SecretString::from("super_secret_private_key"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("merchant_value"));
        assert!(debug_output.contains("public_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_private_key"));
    }
}
