//! Administrator management commands.
//!
//! # Usage
//!
//! ```bash
//! # Invite an administrator (recommended); they choose their own password
//! sparkure admin invite -e admin@example.com -n "Admin Name"
//!
//! # Seed the main administrator directly
//! sparkure admin create -e admin@example.com -n "Admin Name" -p 'long-password'
//! ```

use sparkure_core::{Email, Role, UserId};
use sparkure_server::db::UserRepository;
use sparkure_server::db::users::NewUser;
use sparkure_server::services::auth::{hash_password, validate_password};
use sparkure_server::services::{AuthError, InvitationService};

use super::{CommandError, base_url, connect};

/// Create a verified, active administrator.
///
/// Running it again for an email that already belongs to an administrator
/// reports the existing account and changes nothing.
///
/// # Returns
///
/// The ID of the (new or existing) administrator.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, CommandError> {
    let email = Email::parse(email).map_err(AuthError::from)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingField("name").into());
    }
    validate_password(password)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if let Some(existing) = users.get_by_email(&email).await? {
        if existing.role == Role::Admin {
            tracing::info!(user_id = %existing.id, "Administrator already exists: {email}");
            return Ok(existing.id);
        }
        return Err(CommandError::NotAnAdmin(email.to_string()));
    }

    let password_hash = hash_password(password)?;
    let user = users
        .create(&NewUser {
            full_name: name,
            email: &email,
            password_hash: &password_hash,
            role: Role::Admin,
            is_email_verified: true,
        })
        .await?;

    tracing::info!(
        "Administrator created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}

/// Create an invitation and print its sign-up link.
pub async fn create_invite(email: &str, name: &str, days: i64) -> Result<(), CommandError> {
    let pool = connect().await?;
    let base_url = base_url();

    tracing::info!("Creating invite for: {email}");
    let issued = InvitationService::new(&pool, &base_url)
        .invite(email, name, None, days)
        .await?;

    tracing::info!("Invite created successfully!");
    tracing::info!("  Email: {}", issued.invitation.email);
    tracing::info!("  Name: {}", issued.invitation.full_name);
    tracing::info!("  Expires: {}", issued.invitation.expires_at);
    tracing::info!("");
    tracing::info!("Share this sign-up link with the invitee:");
    tracing::info!("  {}", issued.url);

    Ok(())
}
