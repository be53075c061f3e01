//! Admin invitation repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use sparkure_core::{Email, InvitationId, UserId};

use super::RepositoryError;
use crate::models::{AdminInvitation, PendingInvitation, UserSummary};

const INVITATION_COLUMNS: &str = "i.id, i.email, i.full_name, i.token, i.expires_at, i.is_used, \
                                  i.used_at, i.invited_by, i.created_at";

#[derive(Debug, sqlx::FromRow)]
struct InvitationRow {
    id: InvitationId,
    email: String,
    full_name: String,
    token: String,
    expires_at: DateTime<Utc>,
    is_used: bool,
    used_at: Option<DateTime<Utc>>,
    invited_by: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for AdminInvitation {
    type Error = RepositoryError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            full_name: row.full_name,
            token: row.token,
            expires_at: row.expires_at,
            is_used: row.is_used,
            used_at: row.used_at,
            invited_by_id: row.invited_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    #[sqlx(flatten)]
    invitation: InvitationRow,
    inviter_full_name: Option<String>,
    inviter_email: Option<String>,
}

/// Repository for admin invitation database operations.
pub struct InvitationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InvitationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a token collision.
    pub async fn create(
        &self,
        email: &Email,
        full_name: &str,
        token: &str,
        expires_at: DateTime<Utc>,
        invited_by: Option<UserId>,
    ) -> Result<AdminInvitation, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::create_on(&mut conn, email, full_name, token, expires_at, invited_by).await
    }

    /// Same as [`Self::create`] on an existing connection or transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a token collision.
    pub async fn create_on(
        conn: &mut PgConnection,
        email: &Email,
        full_name: &str,
        token: &str,
        expires_at: DateTime<Utc>,
        invited_by: Option<UserId>,
    ) -> Result<AdminInvitation, RepositoryError> {
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            r"
            INSERT INTO admin_invitations AS i (email, full_name, token, expires_at, invited_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {INVITATION_COLUMNS}
            "
        ))
        .bind(email)
        .bind(full_name)
        .bind(token)
        .bind(expires_at)
        .bind(invited_by)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "invitation token"))?;

        row.try_into()
    }

    /// Whether an unused invitation for `email` is still valid at `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_active_for_email_on(
        conn: &mut PgConnection,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM admin_invitations \
             WHERE email = $1 AND NOT is_used AND expires_at > $2)",
        )
        .bind(email)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;
        Ok(exists)
    }

    /// Serialize invitation checks for one address until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the lock cannot be taken.
    pub async fn lock_email_on(conn: &mut PgConnection, email: &Email) -> Result<(), RepositoryError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('admin_invitation:' || $1))")
            .bind(email)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Unused, unexpired invitations with the inviting admin, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_pending(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingInvitation>, RepositoryError> {
        let rows = sqlx::query_as::<_, PendingRow>(&format!(
            r"
            SELECT {INVITATION_COLUMNS},
                   u.full_name AS inviter_full_name, u.email AS inviter_email
            FROM admin_invitations i
            LEFT JOIN users u ON u.id = i.invited_by
            WHERE NOT i.is_used AND i.expires_at > $1
            ORDER BY i.created_at DESC, i.id DESC
            "
        ))
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let invited_by = match (row.invitation.invited_by, row.inviter_full_name, row.inviter_email)
                {
                    (Some(id), Some(full_name), Some(email)) => Some(UserSummary {
                        id,
                        full_name,
                        email,
                        phone: None,
                    }),
                    _ => None,
                };
                Ok(PendingInvitation {
                    invitation: row.invitation.try_into()?,
                    invited_by,
                })
            })
            .collect()
    }

    /// Look up an invitation by token and lock it for redemption.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_by_token_on(
        conn: &mut PgConnection,
        token: &str,
    ) -> Result<Option<AdminInvitation>, RepositoryError> {
        let row = sqlx::query_as::<_, InvitationRow>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM admin_invitations i WHERE i.token = $1 FOR UPDATE"
        ))
        .bind(token)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the invitation was already used.
    pub async fn mark_used_on(
        conn: &mut PgConnection,
        id: InvitationId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE admin_invitations SET is_used = TRUE, used_at = NOW() \
             WHERE id = $1 AND NOT is_used",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete invitations that expired without being used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM admin_invitations WHERE NOT is_used AND expires_at <= $1")
                .bind(now)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
