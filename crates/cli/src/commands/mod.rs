pub mod admin;
pub mod migrate;
pub mod seed;
pub mod shop;

use bazaar_server::config::MEMORY_DATABASE_URL;
use bazaar_server::db::{self, Repositories};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors reaching the operator database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Operator commands need a real database.
    #[error("DATABASE_URL is `{MEMORY_DATABASE_URL}`; operator commands need PostgreSQL")]
    MemoryStore,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| ConnectError::MissingEnvVar("DATABASE_URL"))?;
    if database_url == MEMORY_DATABASE_URL {
        return Err(ConnectError::MemoryStore);
    }

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&SecretString::from(database_url)).await?)
}

/// Repositories over `DATABASE_URL`.
pub async fn repositories() -> Result<Repositories, ConnectError> {
    Ok(Repositories::postgres(connect().await?))
}
