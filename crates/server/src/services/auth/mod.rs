//! Authentication service.
//!
//! Password accounts for every role, HS256 session tokens, and the two ways
//! an administrator account comes into being: bootstrapping the first admin
//! and redeeming an invitation.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{ADMIN_SESSION_TTL_SECS, Claims, SESSION_TTL_SECS, TokenError, TokenService};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;

use sparkure_core::{Email, Role, UserId};

use crate::db::users::NewUser;
use crate::db::{InvitationRepository, RepositoryError, UserRepository};
use crate::models::{ProfileUpdate, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for a blank name.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let full_name = required("fullName", full_name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&NewUser {
                full_name,
                email: &email,
                password_hash: &password_hash,
                role: Role::User,
                is_email_verified: false,
            })
            .await
            .map_err(conflict_as_existing_user)?;

        tracing::info!(user_id = %user.id, "Customer account created");
        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::AccountDisabled` if the account is deactivated.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(user)
    }

    /// Sign in through the admin entry point. Only administrators pass.
    ///
    /// # Errors
    ///
    /// Same as [`Self::sign_in`], plus `AuthError::NotAdmin` for valid
    /// credentials belonging to another role.
    pub async fn admin_sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.sign_in(email, password).await?;
        if user.role != Role::Admin {
            tracing::warn!(user_id = %user.id, "Non-admin attempted admin sign-in");
            return Err(AuthError::NotAdmin);
        }
        Ok(user)
    }

    /// Replace the caller's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IncorrectPassword` if `current` is wrong.
    /// Returns `AuthError::WeakPassword` if `new` is too short.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let stored = self
            .users
            .get_password_hash(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(current, &stored).map_err(|_| AuthError::IncorrectPassword)?;
        validate_password(new)?;

        let password_hash = hash_password(new)?;
        self.users.update_password(user_id, &password_hash).await?;
        Ok(())
    }

    /// Apply a sparse profile update.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if `fullName` is present but blank.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, AuthError> {
        if let Some(name) = &update.full_name {
            required("fullName", name)?;
        }
        self.users
            .update_profile(user_id, update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // =========================================================================
    // Administrator Accounts
    // =========================================================================

    /// Create the first administrator. Refused once any admin exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AdminExists` if an administrator is already present.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn bootstrap_admin(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let full_name = required("fullName", full_name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        if self.users.count_by_role(Role::Admin).await? > 0 {
            tracing::warn!("Admin bootstrap refused: an administrator already exists");
            return Err(AuthError::AdminExists);
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create(&NewUser {
                full_name,
                email: &email,
                password_hash: &password_hash,
                role: Role::Admin,
                is_email_verified: true,
            })
            .await
            .map_err(conflict_as_existing_user)?;

        tracing::info!(user_id = %user.id, "Initial administrator created");
        Ok(user)
    }

    /// Create an administrator from an invitation and consume it.
    ///
    /// The invitation row is locked for the duration so a token can only be
    /// redeemed once.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword` for
    /// bad passwords, `AuthError::InvalidInvitation` for an unknown, used or
    /// expired token.
    #[instrument(skip_all)]
    pub async fn redeem_invitation(
        &self,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, AuthError> {
        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let invitation = InvitationRepository::lock_by_token_on(&mut tx, token)
            .await?
            .filter(|inv| inv.is_redeemable_at(Utc::now()))
            .ok_or(AuthError::InvalidInvitation)?;

        let user = UserRepository::create_on(
            &mut tx,
            &NewUser {
                full_name: &invitation.full_name,
                email: &invitation.email,
                password_hash: &password_hash,
                role: Role::Admin,
                is_email_verified: true,
            },
        )
        .await
        .map_err(conflict_as_existing_user)?;

        InvitationRepository::mark_used_on(&mut tx, invitation.id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::InvalidInvitation,
                other => AuthError::Repository(other),
            })?;

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(user_id = %user.id, invitation_id = %invitation.id, "Invitation redeemed");
        Ok(user)
    }
}

fn conflict_as_existing_user(err: RepositoryError) -> AuthError {
    match err {
        RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
        other => AuthError::Repository(other),
    }
}

fn required<'s>(field: &'static str, value: &'s str) -> Result<&'s str, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(trimmed)
}

/// Check the password policy.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
