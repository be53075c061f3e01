//! Status and classification enums.
//!
//! Every enum here is stored as a PostgreSQL enum and travels over the wire
//! in `SCREAMING_SNAKE_CASE`. [`CleaningStatus`] additionally carries the
//! booking state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle of a booking.
///
/// ```text
/// SCHEDULED ──► ASSIGNED ──► IN_PROGRESS ──► COMPLETED
///     │
///     └──► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "cleaning_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CleaningStatus {
    #[default]
    Scheduled,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

/// A requested status change that the state machine does not allow.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot move a cleaning from {from} to {to}")]
pub struct IllegalTransition {
    pub from: CleaningStatus,
    pub to: CleaningStatus,
}

impl CleaningStatus {
    /// Whether `self -> next` is an edge of the state machine.
    ///
    /// Staying in the same state is always allowed and is a no-op.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Scheduled | Self::Assigned | Self::Cancelled)
                | (Self::Assigned, Self::Assigned | Self::InProgress)
                | (Self::InProgress, Self::InProgress | Self::Completed)
                | (Self::Completed, Self::Completed)
                | (Self::Cancelled, Self::Cancelled)
        )
    }

    /// Apply a transition, returning the new status.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] if `next` is not reachable from `self`.
    pub const fn transition_to(self, next: Self) -> Result<Self, IllegalTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition {
                from: self,
                to: next,
            })
        }
    }

    /// No further transitions leave this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for CleaningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of an employee application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "application_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// `Approved` and `Rejected` are the only valid review outcomes.
    #[must_use]
    pub const fn is_decision(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "service_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    HomeCleaning,
    OfficeCleaning,
    MoveInOut,
    DeepCleaning,
    RegularCleaning,
}

impl ServiceType {
    /// Human-readable name for messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HomeCleaning => "Home cleaning",
            Self::OfficeCleaning => "Office cleaning",
            Self::MoveInOut => "Move-in/move-out cleaning",
            Self::DeepCleaning => "Deep cleaning",
            Self::RegularCleaning => "Regular cleaning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "priority", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    DigitalWallet,
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "notification_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    CleaningScheduled,
    CleaningStarted,
    CleaningCompleted,
    MessageReceived,
    PaymentReceived,
    PaymentFailed,
    ReviewReceived,
    SystemUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "chat_room_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatRoomType {
    Direct,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "chat_message_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatMessageType {
    #[default]
    Text,
    Image,
    File,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use super::CleaningStatus::{Assigned, Cancelled, Completed, InProgress, Scheduled};

    const ALL: [CleaningStatus; 5] = [Scheduled, Assigned, InProgress, Completed, Cancelled];

    #[test]
    fn test_forward_edges() {
        assert!(Scheduled.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Scheduled.can_transition_to(Cancelled));
    }

    #[test]
    fn test_exactly_four_real_edges() {
        let edges = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from != to && from.can_transition_to(*to))
            .count();
        assert_eq!(edges, 4);
    }

    #[test]
    fn test_same_state_is_noop() {
        for status in ALL {
            assert_eq!(status.transition_to(status), Ok(status));
        }
    }

    #[test]
    fn test_cancel_only_from_scheduled() {
        for from in [Assigned, InProgress, Completed] {
            assert_eq!(
                from.transition_to(Cancelled),
                Err(IllegalTransition {
                    from,
                    to: Cancelled
                })
            );
        }
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!Scheduled.can_transition_to(InProgress));
        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Assigned.can_transition_to(Completed));
        assert!(!Assigned.can_transition_to(Scheduled));
        assert!(!InProgress.can_transition_to(Assigned));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in ALL {
                assert_eq!(from.can_transition_to(to), from == to);
            }
        }
    }

    #[test]
    fn test_illegal_transition_message() {
        let err = Completed.transition_to(Scheduled).unwrap_err();
        assert_eq!(err.to_string(), "cannot move a cleaning from COMPLETED to SCHEDULED");
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&InProgress).unwrap(), "\"IN_PROGRESS\"");
        assert_eq!(
            serde_json::to_string(&ServiceType::MoveInOut).unwrap(),
            "\"MOVE_IN_OUT\""
        );
        assert_eq!(
            serde_json::from_str::<PaymentMethod>("\"DIGITAL_WALLET\"").unwrap(),
            PaymentMethod::DigitalWallet
        );
        assert_eq!(Priority::default(), Priority::Normal);
        assert_eq!(ChatMessageType::default(), ChatMessageType::Text);
    }

    #[test]
    fn test_review_decisions() {
        assert!(ApplicationStatus::Approved.is_decision());
        assert!(ApplicationStatus::Rejected.is_decision());
        assert!(!ApplicationStatus::Pending.is_decision());
    }
}
