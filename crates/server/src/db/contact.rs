//! Contact submission repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sparkure_core::{ContactSubmissionId, UserId};

use super::RepositoryError;
use crate::models::{ContactSubmission, NewContactSubmission};

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: ContactSubmissionId,
    user_id: Option<UserId>,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    message: String,
    created_at: DateTime<Utc>,
}

pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        form: &NewContactSubmission,
    ) -> Result<ContactSubmission, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            INSERT INTO contact_submissions (user_id, first_name, last_name, email, phone, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, first_name, last_name, email, phone, message, created_at
            ",
        )
        .bind(user_id)
        .bind(&form.first_name)
        .bind(&form.last_name)
        .bind(&form.email)
        .bind(&form.phone)
        .bind(&form.message)
        .fetch_one(self.pool)
        .await?;

        Ok(ContactSubmission {
            id: row.id,
            user_id: row.user_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            message: row.message,
            created_at: row.created_at,
        })
    }
}
