//! Admin invitation models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sparkure_core::{Email, InvitationId, UserId};

use super::UserSummary;

/// A single-use invitation to create an admin account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminInvitation {
    pub id: InvitationId,
    pub email: Email,
    pub full_name: String,
    #[serde(skip)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub invited_by_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl AdminInvitation {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Unused and not yet expired.
    #[must_use]
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired_at(now)
    }
}

/// An outstanding invitation together with the admin who sent it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvitation {
    #[serde(flatten)]
    pub invitation: AdminInvitation,
    pub invited_by: Option<UserSummary>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn invitation(expires_in: Duration, is_used: bool) -> AdminInvitation {
        let now = Utc::now();
        AdminInvitation {
            id: InvitationId::new(1),
            email: Email::parse("new.admin@sparkure.com").unwrap(),
            full_name: "New Admin".to_owned(),
            token: "ab".repeat(32),
            expires_at: now + expires_in,
            is_used,
            used_at: None,
            invited_by_id: Some(UserId::new(1)),
            created_at: now,
        }
    }

    #[test]
    fn test_redeemable_only_when_unused_and_unexpired() {
        let now = Utc::now();
        assert!(invitation(Duration::days(7), false).is_redeemable_at(now));
        assert!(!invitation(Duration::days(7), true).is_redeemable_at(now));
        assert!(!invitation(Duration::seconds(-1), false).is_redeemable_at(now));
    }

    #[test]
    fn test_token_is_never_serialized() {
        let json = serde_json::to_value(invitation(Duration::days(1), false)).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["email"], "new.admin@sparkure.com");
        assert_eq!(json["fullName"], "New Admin");
    }
}
