//! Database operations for the marketplace `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `users` - Accounts for customers, employees and administrators
//! - `cleanings` - Bookings, plus read-only `payments` and `reviews`
//! - `employee_applications` - Requests for promotion to employee
//! - `admin_invitations` - Single-use admin sign-up tokens
//! - `notifications` - Per-user inbox
//! - `chat_rooms`, `chat_room_members`, `chat_messages` - Messaging
//! - `contact_submissions` - Contact form entries
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p sparkure-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`query_as` into `FromRow` row structs) so
//! the workspace builds without a live database.

pub mod applications;
pub mod chat;
pub mod cleanings;
pub mod contact;
pub mod invitations;
pub mod notifications;
pub mod users;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use applications::ApplicationRepository;
pub use chat::ChatRepository;
pub use cleanings::CleaningRepository;
pub use contact::ContactRepository;
pub use invitations::InvitationRepository;
pub use notifications::NotificationRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be turned back into a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    /// Unique or exclusion constraint violated.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
