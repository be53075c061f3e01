//! Periodic maintenance.

use sparkure_server::db::UserRepository;
use sparkure_server::services::InvitationService;

use super::{CommandError, base_url, connect};

/// Delete expired invitations that were never used.
pub async fn prune_invitations() -> Result<(), CommandError> {
    let pool = connect().await?;
    let base_url = base_url();

    let removed = InvitationService::new(&pool, &base_url).prune().await?;
    tracing::info!(removed, "Pruned expired invitations");
    Ok(())
}

/// Mark every account's email as verified.
pub async fn verify_emails() -> Result<(), CommandError> {
    let pool = connect().await?;

    let updated = UserRepository::new(&pool).verify_all_emails().await?;
    tracing::info!(updated, "Marked emails verified");
    Ok(())
}
