//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin user directly
//! bazaar admin create -e admin@example.com -n "Admin Name" -p 's3cret!' \
//!     --phone 555-0100 --address "1 Main St" --dob 1990-01-01 --answer football
//!
//! # Give an existing account the admin role
//! bazaar admin promote -e buyer@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `BCRYPT_COST` - bcrypt work factor (default 12)

use bazaar_core::{Email, Role, User};
use bazaar_server::db::RepositoryError;
use bazaar_server::models::NewUser;
use bazaar_server::services::auth::{MIN_PASSWORD_LENGTH, PasswordError, hash_password};
use chrono::NaiveDate;
use thiserror::Error;

use super::{ConnectError, repositories};

const DEFAULT_BCRYPT_COST: u32 = 12;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Password hashing failed: {0}")]
    Password(#[from] PasswordError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters long")]
    WeakPassword,

    #[error("Invalid BCRYPT_COST: {0}")]
    InvalidCost(String),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error("No user with email: {0}")]
    UnknownUser(String),
}

/// Fields for a new admin account.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: String,
    pub name: String,
    pub password: String,
    pub phone: String,
    pub address: String,
    pub dob: NaiveDate,
    pub answer: String,
}

fn bcrypt_cost() -> Result<u32, AdminError> {
    match std::env::var("BCRYPT_COST") {
        Ok(raw) => raw.parse().map_err(|_| AdminError::InvalidCost(raw)),
        Err(_) => Ok(DEFAULT_BCRYPT_COST),
    }
}

/// Create a new admin user.
///
/// # Returns
///
/// The created user.
pub async fn create_user(admin: NewAdmin) -> Result<User, AdminError> {
    let email = Email::parse(&admin.email).map_err(|_| AdminError::InvalidEmail(admin.email))?;
    if admin.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminError::WeakPassword);
    }

    let repos = repositories().await?;

    // Check if user already exists
    if repos.users.get_by_email(&email).await?.is_some() {
        return Err(AdminError::UserExists(email.into_inner()));
    }

    tracing::info!("Creating admin user: {}", email);
    let password_hash = hash_password(&admin.password, bcrypt_cost()?)?;
    let user = repos
        .users
        .create(&NewUser {
            name: admin.name,
            email,
            password_hash,
            phone: admin.phone,
            address: admin.address,
            dob: admin.dob,
            answer: admin.answer,
        })
        .await?;
    let user = repos.users.set_role(user.id, Role::Admin).await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user)
}

/// Give an existing user the admin role.
pub async fn promote(email: &str) -> Result<User, AdminError> {
    let parsed = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let repos = repositories().await?;

    let user = repos
        .users
        .get_by_email(&parsed)
        .await?
        .ok_or_else(|| AdminError::UnknownUser(email.to_owned()))?;

    if user.role.is_admin() {
        tracing::info!("{} is already an admin", user.email);
        return Ok(user);
    }

    let user = repos.users.set_role(user.id, Role::Admin).await?;
    tracing::info!("Promoted {} (ID {}) to admin", user.email, user.id);
    Ok(user)
}
