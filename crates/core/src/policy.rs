//! Access rules.
//!
//! Every handler asks [`authorize`] before touching a booking or an
//! admin-only resource, so the permission matrix lives in one place:
//!
//! | Actor             | Read | Edit fields                             | Assign | Status edges                       | Delete                        |
//! |-------------------|------|-----------------------------------------|--------|------------------------------------|-------------------------------|
//! | Admin             | any  | any                                     | SCHEDULED, ASSIGNED | every legal edge      | no                            |
//! | Owning customer   | own  | date, address, note, priority (SCHEDULED) | no   | SCHEDULED -> CANCELLED             | own, SCHEDULED, role USER     |
//! | Assigned employee | own  | note, duration                          | no     | ASSIGNED -> IN_PROGRESS -> COMPLETED | no                          |
//! | Anyone else       | no   | no                                      | no     | no                                 | no                            |
//!
//! Party checks run first, so an unrelated caller always sees `Forbidden`
//! rather than learning the booking's state from an `IllegalTransition`.

use crate::types::{CleaningStatus, IllegalTransition, Role, UserId};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// What the caller wants to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The booking collection (create, list).
    Cleanings,
    /// A single booking, described by the fields that decide access.
    Cleaning {
        customer_id: UserId,
        employee_id: Option<UserId>,
        status: CleaningStatus,
    },
    /// Anything gated on a role: the admin console, the review queue,
    /// invitations, a customer's history.
    RoleGated(Role),
}

/// Booking fields that can be patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableField {
    Date,
    Address,
    Note,
    Priority,
    Price,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Edit(EditableField),
    Assign,
    Transition(CleaningStatus),
    Delete,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
    /// Work has started or the booking is closed; the assignee is fixed.
    #[error("cannot assign an employee to a {0} cleaning")]
    NotAssignable(CleaningStatus),
}

/// Decide whether `actor` may perform `action` on `resource`.
///
/// # Errors
///
/// Returns [`PolicyError::Forbidden`] when the caller lacks the role or
/// relationship required, [`PolicyError::IllegalTransition`] when the
/// caller may drive the booking but the requested edge does not exist, and
/// [`PolicyError::NotAssignable`] for an assignment after work started.
pub fn authorize(actor: &Actor, resource: &Resource, action: Action) -> Result<(), PolicyError> {
    match *resource {
        Resource::RoleGated(required) => {
            if actor.role.satisfies(required) {
                Ok(())
            } else {
                Err(PolicyError::Forbidden("Insufficient permissions"))
            }
        }
        Resource::Cleanings => match action {
            // Booking is a customer action; admins are not exempt.
            Action::Create if actor.role != Role::User => {
                Err(PolicyError::Forbidden("Only customers can create bookings"))
            }
            Action::Create | Action::Read => Ok(()),
            _ => Err(PolicyError::Forbidden("Access denied")),
        },
        Resource::Cleaning {
            customer_id,
            employee_id,
            status,
        } => authorize_cleaning(actor, customer_id, employee_id, status, action),
    }
}

fn authorize_cleaning(
    actor: &Actor,
    customer_id: UserId,
    employee_id: Option<UserId>,
    status: CleaningStatus,
    action: Action,
) -> Result<(), PolicyError> {
    const DENIED: PolicyError = PolicyError::Forbidden("Access denied");

    let is_owner = actor.id == customer_id;
    let is_assignee = employee_id == Some(actor.id);

    if action == Action::Delete {
        return if actor.role == Role::User && is_owner && status == CleaningStatus::Scheduled {
            Ok(())
        } else {
            Err(PolicyError::Forbidden("Cannot delete this cleaning"))
        };
    }

    if !(actor.is_admin() || is_owner || is_assignee) {
        return Err(DENIED);
    }

    match action {
        Action::Read => Ok(()),
        Action::Create => Err(DENIED),
        Action::Assign if actor.is_admin() => match status {
            CleaningStatus::Scheduled | CleaningStatus::Assigned => Ok(()),
            other => Err(PolicyError::NotAssignable(other)),
        },
        Action::Assign => Err(PolicyError::Forbidden(
            "Only administrators can assign employees",
        )),
        Action::Edit(field) => {
            let allowed = actor.is_admin()
                || (is_owner
                    && status == CleaningStatus::Scheduled
                    && matches!(
                        field,
                        EditableField::Date
                            | EditableField::Address
                            | EditableField::Note
                            | EditableField::Priority
                    ))
                || (is_assignee && matches!(field, EditableField::Note | EditableField::Duration));
            if allowed { Ok(()) } else { Err(DENIED) }
        }
        Action::Transition(to) => {
            if to == status {
                return Ok(());
            }
            let may_drive = actor.is_admin()
                || (is_owner && to == CleaningStatus::Cancelled)
                || (is_assignee
                    && matches!(to, CleaningStatus::InProgress | CleaningStatus::Completed));
            if !may_drive {
                return Err(PolicyError::Forbidden(
                    "You cannot move this booking to that status",
                ));
            }
            status.transition_to(to)?;
            Ok(())
        }
        Action::Delete => Err(DENIED),
    }
}
