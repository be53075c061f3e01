//! Integration tests for Sparkure.
//!
//! # Running Tests
//!
//! ```bash
//! # Database scenarios (migrations are applied on first connect)
//! SPARKURE_TEST_DATABASE_URL=postgres://... cargo test -p sparkure-integration-tests -- --ignored
//!
//! # HTTP tests against a running server
//! SPARKURE_BASE_URL=http://localhost:3000 cargo test -p sparkure-integration-tests --test http_api -- --ignored
//! ```
//!
//! Every test creates its own accounts with unique emails, so runs can share
//! one database.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use sparkure_core::{Email, Role};
use sparkure_server::db::UserRepository;
use sparkure_server::db::users::NewUser;
use sparkure_server::models::User;
use sparkure_server::services::AuthService;
use sparkure_server::services::auth::hash_password;

/// Password given to every account these tests create.
pub const PASSWORD: &str = "correct-horse-battery";

/// A migrated database handle.
pub struct TestContext {
    pub pool: PgPool,
}

impl TestContext {
    /// Connect to `SPARKURE_TEST_DATABASE_URL` and apply migrations.
    pub async fn new() -> Self {
        let url = std::env::var("SPARKURE_TEST_DATABASE_URL")
            .map(SecretString::from)
            .expect("SPARKURE_TEST_DATABASE_URL must be set");
        let pool = sparkure_server::db::create_pool(&url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("../server/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Self { pool }
    }

    /// Sign up a customer through the normal path.
    pub async fn customer(&self, name: &str) -> User {
        AuthService::new(&self.pool)
            .sign_up(name, &unique_email(name), PASSWORD)
            .await
            .expect("Failed to sign up customer")
    }

    /// Insert an active, verified account with `role`.
    pub async fn user_with_role(&self, name: &str, role: Role) -> User {
        let email = Email::parse(&unique_email(name)).expect("valid email");
        let password_hash = hash_password(PASSWORD).expect("hash");
        UserRepository::new(&self.pool)
            .create(&NewUser {
                full_name: name,
                email: &email,
                password_hash: &password_hash,
                role,
                is_email_verified: true,
            })
            .await
            .expect("Failed to create user")
    }

    pub async fn admin(&self) -> User {
        self.user_with_role("Admin", Role::Admin).await
    }

    pub async fn employee(&self, name: &str) -> User {
        self.user_with_role(name, Role::Employee).await
    }

    /// Re-read an account.
    pub async fn reload(&self, user: &User) -> User {
        UserRepository::new(&self.pool)
            .get_by_id(user.id)
            .await
            .expect("query")
            .expect("user exists")
    }
}

/// `<prefix>-<uuid>@example.com`, lowercased.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!(
        "{}-{}@example.com",
        prefix.to_lowercase().replace(' ', "-"),
        Uuid::new_v4().simple()
    )
}

/// Base URL of a running server for HTTP tests.
#[must_use]
pub fn base_url() -> String {
    std::env::var("SPARKURE_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}
