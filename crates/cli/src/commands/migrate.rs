//! Database migrations.
//!
//! Migrations live in `crates/server/migrations/` and are embedded at build
//! time. The server never migrates on startup; this is the only entry point.

use super::{CommandError, connect};

/// Apply every pending migration.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
