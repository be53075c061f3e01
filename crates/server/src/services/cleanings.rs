//! Booking lifecycle.
//!
//! Every operation authorizes through [`sparkure_core::authorize`]. Updates
//! lock the row, resolve the patch against the current state, write it and
//! queue the resulting notifications in one transaction.

use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use sparkure_core::{
    Action, Actor, CleaningId, CleaningStatus, EditableField, NotificationType, Page, PageInfo,
    PolicyError, Resource, Role, UserId, authorize,
};

use crate::db::cleanings::{CleaningChanges, CleaningFilter};
use crate::db::{CleaningRepository, NotificationRepository, RepositoryError, UserRepository};
use crate::models::{
    Cleaning, CleaningDetail, CleaningForm, CleaningPatch, HistorySummary, NewNotification,
};

#[derive(Debug, Error)]
pub enum CleaningError {
    #[error("cleaning not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CleaningError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(err.into())
    }
}

pub struct CleaningService<'a> {
    pool: &'a PgPool,
    cleanings: CleaningRepository<'a>,
}

impl<'a> CleaningService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            cleanings: CleaningRepository::new(pool),
        }
    }

    /// Book a cleaning for the calling customer.
    ///
    /// # Errors
    ///
    /// Returns `CleaningError::Policy` for non-customers and
    /// `CleaningError::Validation` for a missing or out-of-range field.
    #[instrument(skip(self, form), fields(actor = %actor.id))]
    pub async fn create(
        &self,
        actor: Actor,
        form: CleaningForm,
    ) -> Result<CleaningDetail, CleaningError> {
        authorize(&actor, &Resource::Cleanings, Action::Create)?;
        let new = form.validated().map_err(CleaningError::Validation)?;

        let mut tx = self.pool.begin().await?;
        let cleaning = CleaningRepository::create_on(&mut tx, actor.id, &new).await?;
        NotificationRepository::insert_on(
            &mut tx,
            &NewNotification::new(
                actor.id,
                NotificationType::CleaningScheduled,
                "Cleaning scheduled",
                format!(
                    "{} booked for {}",
                    cleaning.service_type.label(),
                    cleaning.date.format("%Y-%m-%d %H:%M UTC")
                ),
            )
            .with_data(json!({ "cleaningId": cleaning.id })),
        )
        .await?;
        let detail = CleaningRepository::get_detail_on(&mut tx, cleaning.id)
            .await?
            .ok_or(CleaningError::NotFound)?;
        tx.commit().await?;

        tracing::info!(cleaning_id = %cleaning.id, "Cleaning booked");
        Ok(detail)
    }

    /// Bookings visible to the actor: their own as a customer, their
    /// assignments as an employee, everything as an admin.
    ///
    /// # Errors
    ///
    /// Returns `CleaningError::Repository` if a query fails.
    pub async fn list(
        &self,
        actor: Actor,
        status: Option<CleaningStatus>,
        page: Page,
    ) -> Result<(Vec<CleaningDetail>, PageInfo), CleaningError> {
        authorize(&actor, &Resource::Cleanings, Action::Read)?;

        let filter = CleaningFilter {
            status,
            ..scope_for(actor)
        };
        let (items, total) = self.cleanings.list(filter, page).await?;
        Ok((items, page.info(total)))
    }

    /// The customer's completed bookings with spend totals.
    ///
    /// `filter` narrows by service type and date range; its party and status
    /// fields are overwritten.
    ///
    /// # Errors
    ///
    /// Returns `CleaningError::Repository` if a query fails.
    pub async fn history(
        &self,
        customer: UserId,
        filter: CleaningFilter,
        page: Page,
    ) -> Result<(Vec<CleaningDetail>, PageInfo, HistorySummary), CleaningError> {
        let filter = CleaningFilter {
            customer_id: Some(customer),
            employee_id: None,
            status: Some(CleaningStatus::Completed),
            ..filter
        };
        let (items, total) = self.cleanings.list(filter, page).await?;
        let summary = self.cleanings.summarize(filter).await?;
        Ok((items, page.info(total), summary))
    }

    /// # Errors
    ///
    /// Returns `CleaningError::NotFound` or `CleaningError::Policy`.
    pub async fn get(&self, actor: Actor, id: CleaningId) -> Result<CleaningDetail, CleaningError> {
        let detail = self
            .cleanings
            .get_detail(id)
            .await?
            .ok_or(CleaningError::NotFound)?;
        authorize(&actor, &detail.cleaning.resource(), Action::Read)?;
        Ok(detail)
    }

    /// Apply a sparse patch.
    ///
    /// # Errors
    ///
    /// Returns `CleaningError::NotFound`, `CleaningError::Policy` (forbidden
    /// field or illegal transition) or `CleaningError::Validation`.
    #[instrument(skip(self, patch), fields(actor = %actor.id))]
    pub async fn update(
        &self,
        actor: Actor,
        id: CleaningId,
        patch: CleaningPatch,
    ) -> Result<CleaningDetail, CleaningError> {
        let mut tx = self.pool.begin().await?;

        let before = CleaningRepository::lock_on(&mut tx, id)
            .await?
            .ok_or(CleaningError::NotFound)?;
        let changes = plan_update(actor, &before, patch)?;

        if let Some(employee_id) = changes.employee_id {
            let assignable = UserRepository::get_by_id_on(&mut tx, employee_id)
                .await?
                .is_some_and(|u| u.is_active && u.role == Role::Employee);
            if !assignable {
                return Err(CleaningError::Validation(
                    "employeeId must reference an active employee".to_owned(),
                ));
            }
        }

        let after = CleaningRepository::update_on(&mut tx, id, &changes).await?;
        for notification in lifecycle_notifications(&before, &after) {
            NotificationRepository::insert_on(&mut tx, &notification).await?;
        }
        let detail = CleaningRepository::get_detail_on(&mut tx, id)
            .await?
            .ok_or(CleaningError::NotFound)?;
        tx.commit().await?;

        if before.status != after.status {
            tracing::info!(
                cleaning_id = %id,
                from = %before.status,
                to = %after.status,
                "Cleaning status changed"
            );
        }
        Ok(detail)
    }

    /// Remove a booking. The row is locked before the policy check so a
    /// concurrent assignment cannot slip in between.
    ///
    /// # Errors
    ///
    /// Returns `CleaningError::NotFound` or `CleaningError::Policy`.
    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn delete(&self, actor: Actor, id: CleaningId) -> Result<(), CleaningError> {
        let mut tx = self.pool.begin().await?;

        let cleaning = CleaningRepository::lock_on(&mut tx, id)
            .await?
            .ok_or(CleaningError::NotFound)?;
        authorize(&actor, &cleaning.resource(), Action::Delete)?;

        CleaningRepository::delete_scheduled_on(&mut tx, id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CleaningError::NotFound,
                other => CleaningError::Repository(other),
            })?;
        tx.commit().await?;

        tracing::info!(cleaning_id = %id, "Cleaning deleted");
        Ok(())
    }
}

/// The rows an actor may list.
#[must_use]
pub fn scope_for(actor: Actor) -> CleaningFilter {
    match actor.role {
        Role::User => CleaningFilter {
            customer_id: Some(actor.id),
            ..CleaningFilter::default()
        },
        Role::Employee => CleaningFilter {
            employee_id: Some(actor.id),
            ..CleaningFilter::default()
        },
        Role::Admin => CleaningFilter::default(),
    }
}

/// Authorize every part of `patch` against `current` and resolve it into
/// concrete column changes.
///
/// Assigning an employee to a `SCHEDULED` booking without naming a status
/// moves it to `ASSIGNED`. Setting the current status again is dropped.
///
/// # Errors
///
/// Returns `CleaningError::Policy` on the first forbidden part or illegal
/// transition, `CleaningError::Validation` for bad values.
pub fn plan_update(
    actor: Actor,
    current: &Cleaning,
    patch: CleaningPatch,
) -> Result<CleaningChanges, CleaningError> {
    if patch.is_empty() {
        return Err(CleaningError::Validation("No fields to update".to_owned()));
    }
    patch.check_ranges().map_err(CleaningError::Validation)?;

    let resource = current.resource();
    let edits = [
        (patch.date.is_some(), EditableField::Date),
        (patch.address.is_some(), EditableField::Address),
        (patch.note.is_some(), EditableField::Note),
        (patch.priority.is_some(), EditableField::Priority),
        (patch.price.is_some(), EditableField::Price),
        (patch.duration.is_some(), EditableField::Duration),
    ];
    for (_, field) in edits.into_iter().filter(|(present, _)| *present) {
        authorize(&actor, &resource, Action::Edit(field))?;
    }
    if patch.employee_id.is_some() {
        authorize(&actor, &resource, Action::Assign)?;
    }

    let target = match (patch.status, patch.employee_id) {
        (Some(status), _) => Some(status),
        (None, Some(_)) if current.status == CleaningStatus::Scheduled => {
            Some(CleaningStatus::Assigned)
        }
        _ => None,
    };
    if let Some(to) = target {
        authorize(&actor, &resource, Action::Transition(to))?;
        if to == CleaningStatus::Assigned
            && current.employee_id.is_none()
            && patch.employee_id.is_none()
        {
            return Err(CleaningError::Validation(
                "Assign an employee before marking the booking ASSIGNED".to_owned(),
            ));
        }
    }

    Ok(CleaningChanges {
        status: target.filter(|to| *to != current.status),
        employee_id: patch.employee_id,
        date: patch.date,
        address: patch.address.map(|a| a.trim().to_owned()),
        note: patch.note,
        price: patch.price,
        duration: patch.duration,
        priority: patch.priority,
    })
}

/// Notifications caused by moving a booking from `before` to `after`.
#[must_use]
pub fn lifecycle_notifications(before: &Cleaning, after: &Cleaning) -> Vec<NewNotification> {
    let data = json!({ "cleaningId": after.id });
    let mut out = Vec::new();

    if let Some(employee_id) = after.employee_id
        && before.employee_id != Some(employee_id)
    {
        out.push(
            NewNotification::new(
                employee_id,
                NotificationType::CleaningScheduled,
                "New cleaning assigned",
                format!(
                    "{} at {} on {}",
                    after.service_type.label(),
                    after.address,
                    after.date.format("%Y-%m-%d %H:%M UTC")
                ),
            )
            .with_data(data.clone()),
        );
    }

    if before.status != after.status {
        let customer_notice = match after.status {
            CleaningStatus::InProgress => Some((
                NotificationType::CleaningStarted,
                "Cleaning started",
                "Your cleaner has started working",
            )),
            CleaningStatus::Completed => Some((
                NotificationType::CleaningCompleted,
                "Cleaning completed",
                "Your cleaning has been completed",
            )),
            _ => None,
        };
        if let Some((kind, title, message)) = customer_notice {
            out.push(NewNotification::new(after.customer_id, kind, title, message).with_data(data));
        }
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sparkure_core::{Priority, ServiceType, UserId};

    use super::*;

    const ALICE: UserId = UserId::new(1);
    const BOB: UserId = UserId::new(2);
    const ADMIN: UserId = UserId::new(9);

    fn cleaning(employee_id: Option<UserId>, status: CleaningStatus) -> Cleaning {
        let now = Utc::now();
        Cleaning {
            id: CleaningId::new(10),
            customer_id: ALICE,
            employee_id,
            service_type: ServiceType::HomeCleaning,
            status,
            date: now,
            address: "123 Main St".to_owned(),
            note: None,
            price: None,
            duration: None,
            priority: Priority::Normal,
            created_at: now,
            updated_at: now,
        }
    }

    const fn admin() -> Actor {
        Actor::new(ADMIN, Role::Admin)
    }

    fn is_forbidden(err: &CleaningError) -> bool {
        matches!(err, CleaningError::Policy(PolicyError::Forbidden(_)))
    }

    #[test]
    fn test_empty_patch_rejected() {
        let err = plan_update(admin(), &cleaning(None, CleaningStatus::Scheduled), CleaningPatch::default())
            .unwrap_err();
        assert!(matches!(err, CleaningError::Validation(_)));
    }

    #[test]
    fn test_assignment_moves_scheduled_to_assigned() {
        let patch = CleaningPatch {
            employee_id: Some(BOB),
            ..CleaningPatch::default()
        };
        let changes = plan_update(admin(), &cleaning(None, CleaningStatus::Scheduled), patch).unwrap();
        assert_eq!(changes.employee_id, Some(BOB));
        assert_eq!(changes.status, Some(CleaningStatus::Assigned));
    }

    #[test]
    fn test_reassignment_keeps_status() {
        let patch = CleaningPatch {
            employee_id: Some(UserId::new(3)),
            ..CleaningPatch::default()
        };
        let changes =
            plan_update(admin(), &cleaning(Some(BOB), CleaningStatus::Assigned), patch).unwrap();
        assert_eq!(changes.status, None);
    }

    #[test]
    fn test_assigned_requires_an_employee() {
        let patch = CleaningPatch {
            status: Some(CleaningStatus::Assigned),
            ..CleaningPatch::default()
        };
        let err = plan_update(admin(), &cleaning(None, CleaningStatus::Scheduled), patch).unwrap_err();
        assert!(matches!(err, CleaningError::Validation(_)));
    }

    #[test]
    fn test_closed_booking_refuses_assignment() {
        for status in [CleaningStatus::Cancelled, CleaningStatus::Completed, CleaningStatus::InProgress] {
            let patch = CleaningPatch {
                employee_id: Some(UserId::new(3)),
                ..CleaningPatch::default()
            };
            let err = plan_update(admin(), &cleaning(Some(BOB), status), patch).unwrap_err();
            assert!(matches!(
                err,
                CleaningError::Policy(PolicyError::NotAssignable(s)) if s == status
            ));
        }
    }

    #[test]
    fn test_illegal_transition_is_reported() {
        let patch = CleaningPatch {
            status: Some(CleaningStatus::Completed),
            ..CleaningPatch::default()
        };
        let err = plan_update(admin(), &cleaning(None, CleaningStatus::Scheduled), patch).unwrap_err();
        assert!(matches!(
            err,
            CleaningError::Policy(PolicyError::IllegalTransition(_))
        ));
    }

    #[test]
    fn test_customer_cannot_set_price_or_assign() {
        let alice = Actor::new(ALICE, Role::User);
        let current = cleaning(None, CleaningStatus::Scheduled);

        let price = CleaningPatch {
            price: Some(Decimal::new(5000, 2)),
            ..CleaningPatch::default()
        };
        assert!(is_forbidden(&plan_update(alice, &current, price).unwrap_err()));

        let assign = CleaningPatch {
            employee_id: Some(BOB),
            ..CleaningPatch::default()
        };
        assert!(is_forbidden(&plan_update(alice, &current, assign).unwrap_err()));
    }

    #[test]
    fn test_customer_cancels_and_edits_while_scheduled() {
        let alice = Actor::new(ALICE, Role::User);
        let patch = CleaningPatch {
            status: Some(CleaningStatus::Cancelled),
            note: Some("gate code 1234".to_owned()),
            ..CleaningPatch::default()
        };
        let changes = plan_update(alice, &cleaning(None, CleaningStatus::Scheduled), patch).unwrap();
        assert_eq!(changes.status, Some(CleaningStatus::Cancelled));
        assert_eq!(changes.note.as_deref(), Some("gate code 1234"));
    }

    #[test]
    fn test_assignee_starts_work() {
        let bob = Actor::new(BOB, Role::Employee);
        let patch = CleaningPatch {
            status: Some(CleaningStatus::InProgress),
            duration: Some(90),
            ..CleaningPatch::default()
        };
        let changes = plan_update(bob, &cleaning(Some(BOB), CleaningStatus::Assigned), patch).unwrap();
        assert_eq!(changes.status, Some(CleaningStatus::InProgress));
        assert_eq!(changes.duration, Some(90));
    }

    #[test]
    fn test_stranger_forbidden_before_transition_table() {
        let carol = Actor::new(UserId::new(3), Role::Employee);
        let patch = CleaningPatch {
            status: Some(CleaningStatus::Completed),
            ..CleaningPatch::default()
        };
        let err = plan_update(carol, &cleaning(Some(BOB), CleaningStatus::Scheduled), patch).unwrap_err();
        assert!(is_forbidden(&err));
    }

    #[test]
    fn test_same_status_is_dropped() {
        let patch = CleaningPatch {
            status: Some(CleaningStatus::Assigned),
            note: Some("x".to_owned()),
            ..CleaningPatch::default()
        };
        let changes =
            plan_update(admin(), &cleaning(Some(BOB), CleaningStatus::Assigned), patch).unwrap();
        assert_eq!(changes.status, None);
    }

    #[test]
    fn test_scope_per_role() {
        let f = scope_for(Actor::new(ALICE, Role::User));
        assert_eq!((f.customer_id, f.employee_id), (Some(ALICE), None));
        let f = scope_for(Actor::new(BOB, Role::Employee));
        assert_eq!((f.customer_id, f.employee_id), (None, Some(BOB)));
        let f = scope_for(admin());
        assert_eq!((f.customer_id, f.employee_id), (None, None));
    }

    #[test]
    fn test_lifecycle_notifications() {
        let scheduled = cleaning(None, CleaningStatus::Scheduled);
        let assigned = cleaning(Some(BOB), CleaningStatus::Assigned);
        let started = cleaning(Some(BOB), CleaningStatus::InProgress);
        let done = cleaning(Some(BOB), CleaningStatus::Completed);

        let n = lifecycle_notifications(&scheduled, &assigned);
        assert_eq!(n.len(), 1);
        assert_eq!(n[0].user_id, BOB);
        assert_eq!(n[0].kind, NotificationType::CleaningScheduled);

        let n = lifecycle_notifications(&assigned, &started);
        assert_eq!(n.len(), 1);
        assert_eq!(n[0].user_id, ALICE);
        assert_eq!(n[0].kind, NotificationType::CleaningStarted);

        let n = lifecycle_notifications(&started, &done);
        assert_eq!(n[0].kind, NotificationType::CleaningCompleted);

        assert!(lifecycle_notifications(&assigned, &assigned).is_empty());
    }
}
