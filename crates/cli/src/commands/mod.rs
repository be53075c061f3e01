//! Subcommand implementations.

pub mod admin;
pub mod housekeeping;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use sparkure_server::db::{RepositoryError, create_pool};
use sparkure_server::services::{AuthError, InvitationError};

/// Errors surfaced by any subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Invitation(#[from] InvitationError),

    /// The email belongs to an account that is not an administrator.
    #[error("A non-admin account already uses {0}")]
    NotAnAdmin(String),
}

/// Connect using `SPARKURE_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CommandError> {
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("SPARKURE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("SPARKURE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(create_pool(&database_url).await?)
}

/// Public base URL for generated links, without trailing slash.
pub fn base_url() -> String {
    std::env::var("SPARKURE_BASE_URL")
        .map(|url| url.trim_end_matches('/').to_owned())
        .unwrap_or_else(|_| {
            tracing::warn!("SPARKURE_BASE_URL not set, using default");
            "http://localhost:3000".to_owned()
        })
}
