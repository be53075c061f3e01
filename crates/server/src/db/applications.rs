//! Employee application repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use sparkure_core::{ApplicationId, ApplicationStatus, Page, UserId};

use super::RepositoryError;
use crate::models::{ApplicationWithApplicant, EmployeeApplication, NewApplication, UserSummary};

const APPLICATION_COLUMNS: &str = "a.id, a.user_id, a.phone, a.address, a.experience, a.skills, \
                                   a.availability, a.status, a.reviewed_by, a.reviewed_at, \
                                   a.notes, a.created_at, a.updated_at";

const APPLICANT_COLUMNS: &str =
    "u.full_name AS applicant_full_name, u.email AS applicant_email, u.phone AS applicant_phone";

#[derive(Debug, sqlx::FromRow)]
struct ApplicationRow {
    id: ApplicationId,
    user_id: UserId,
    phone: String,
    address: String,
    experience: String,
    skills: Vec<String>,
    availability: String,
    status: ApplicationStatus,
    reviewed_by: Option<UserId>,
    reviewed_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ApplicationRow> for EmployeeApplication {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            phone: row.phone,
            address: row.address,
            experience: row.experience,
            skills: row.skills,
            availability: row.availability,
            status: row.status,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApplicantRow {
    #[sqlx(flatten)]
    application: ApplicationRow,
    applicant_full_name: String,
    applicant_email: String,
    applicant_phone: Option<String>,
}

impl From<ApplicantRow> for ApplicationWithApplicant {
    fn from(row: ApplicantRow) -> Self {
        let user = UserSummary {
            id: row.application.user_id,
            full_name: row.applicant_full_name,
            email: row.applicant_email,
            phone: row.applicant_phone,
        };
        Self {
            application: row.application.into(),
            user,
        }
    }
}

/// Repository for employee application database operations.
pub struct ApplicationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ApplicationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a `PENDING` application.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a pending
    /// application (enforced by a partial unique index).
    pub async fn create(
        &self,
        user_id: UserId,
        new: &NewApplication,
    ) -> Result<ApplicationWithApplicant, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (id,): (ApplicationId,) = sqlx::query_as(
            r"
            INSERT INTO employee_applications
                (user_id, phone, address, experience, skills, availability)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(&new.experience)
        .bind(&new.skills)
        .bind(&new.availability)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "pending application"))?;

        let created = Self::get_with_applicant_on(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_pending(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM employee_applications \
             WHERE user_id = $1 AND status = 'PENDING')",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// The user's most recent application, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<EmployeeApplication>, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM employee_applications a \
             WHERE a.user_id = $1 ORDER BY a.created_at DESC, a.id DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Read an application and lock it for the rest of the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_on(
        conn: &mut PgConnection,
        id: ApplicationId,
    ) -> Result<Option<EmployeeApplication>, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM employee_applications a WHERE a.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Record a review decision.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the application vanished.
    pub async fn record_review_on(
        conn: &mut PgConnection,
        id: ApplicationId,
        status: ApplicationStatus,
        reviewer: UserId,
        notes: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE employee_applications
            SET status = $2, reviewed_by = $3, reviewed_at = NOW(), notes = $4, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .bind(reviewer)
        .bind(notes)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_applicant_on(
        conn: &mut PgConnection,
        id: ApplicationId,
    ) -> Result<Option<ApplicationWithApplicant>, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicantRow>(&format!(
            "SELECT {APPLICATION_COLUMNS}, {APPLICANT_COLUMNS} \
             FROM employee_applications a JOIN users u ON u.id = a.user_id \
             WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List applications, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        status: Option<ApplicationStatus>,
        page: Page,
    ) -> Result<(Vec<ApplicationWithApplicant>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, ApplicantRow>(&format!(
            "SELECT {APPLICATION_COLUMNS}, {APPLICANT_COLUMNS} \
             FROM employee_applications a JOIN users u ON u.id = a.user_id \
             WHERE ($1::application_status IS NULL OR a.status = $1) \
             ORDER BY a.created_at DESC, a.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM employee_applications \
             WHERE ($1::application_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }
}
