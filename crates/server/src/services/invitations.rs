//! Admin invitations.
//!
//! Invitations are not emailed; the sign-up URL is handed back to the
//! inviting admin.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use sparkure_core::{Email, UserId};

use crate::db::{InvitationRepository, RepositoryError, UserRepository};
use crate::models::{AdminInvitation, PendingInvitation};

/// Days an invitation stays redeemable unless told otherwise.
pub const DEFAULT_VALIDITY_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] sparkure_core::EmailError),

    #[error("fullName is required")]
    MissingName,

    #[error("a user with this email already exists")]
    UserExists,

    #[error("an active invitation for this email already exists")]
    AlreadyInvited,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for InvitationError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(err.into())
    }
}

/// A freshly created invitation with its sign-up link.
#[derive(Debug, Clone)]
pub struct IssuedInvitation {
    pub invitation: AdminInvitation,
    pub url: String,
}

pub struct InvitationService<'a> {
    pool: &'a PgPool,
    invitations: InvitationRepository<'a>,
    base_url: &'a str,
}

impl<'a> InvitationService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, base_url: &'a str) -> Self {
        Self {
            pool,
            invitations: InvitationRepository::new(pool),
            base_url,
        }
    }

    /// Invite someone to become an administrator.
    ///
    /// The existence checks and the insert run under a per-address lock, so
    /// concurrent invites for one email yield a single invitation.
    ///
    /// # Errors
    ///
    /// Returns `InvitationError::UserExists` if the email is registered and
    /// `InvitationError::AlreadyInvited` if an unexpired, unused invitation
    /// for it is outstanding.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn invite(
        &self,
        email: &str,
        full_name: &str,
        invited_by: Option<UserId>,
        valid_for_days: i64,
    ) -> Result<IssuedInvitation, InvitationError> {
        let email = Email::parse(email)?;
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(InvitationError::MissingName);
        }

        let mut tx = self.pool.begin().await?;
        InvitationRepository::lock_email_on(&mut tx, &email).await?;

        if UserRepository::get_by_email_on(&mut tx, &email).await?.is_some() {
            return Err(InvitationError::UserExists);
        }
        let now = Utc::now();
        if InvitationRepository::has_active_for_email_on(&mut tx, &email, now).await? {
            return Err(InvitationError::AlreadyInvited);
        }

        let token = generate_token();
        let invitation = InvitationRepository::create_on(
            &mut tx,
            &email,
            full_name,
            &token,
            expiry_from(now, valid_for_days),
            invited_by,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(invitation_id = %invitation.id, "Admin invitation created");
        Ok(IssuedInvitation {
            url: invitation_url(self.base_url, &token),
            invitation,
        })
    }

    /// # Errors
    ///
    /// Returns `InvitationError::Repository` if the query fails.
    pub async fn pending(&self) -> Result<Vec<PendingInvitation>, InvitationError> {
        Ok(self.invitations.list_pending(Utc::now()).await?)
    }

    /// Delete expired, unused invitations. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `InvitationError::Repository` if the query fails.
    pub async fn prune(&self) -> Result<u64, InvitationError> {
        Ok(self.invitations.prune_expired(Utc::now()).await?)
    }
}

/// 32 random bytes, hex encoded.
#[must_use]
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

#[must_use]
pub fn invitation_url(base_url: &str, token: &str) -> String {
    format!(
        "{}/admin/sign-up?token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

fn expiry_from(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days.clamp(1, 30))
}
