//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bazaar migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! `crates/server/migrations/`, embedded at build time.

use thiserror::Error;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    bazaar_server::MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
