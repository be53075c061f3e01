//! Booking lifecycle against a real database.
//!
//! Requires `SPARKURE_TEST_DATABASE_URL`.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use sparkure_core::{
    CleaningStatus, NotificationType, Page, PolicyError, Priority, ServiceType,
};
use sparkure_integration_tests::TestContext;
use sparkure_server::db::NotificationRepository;
use sparkure_server::db::cleanings::CleaningFilter;
use sparkure_server::models::{CleaningForm, CleaningPatch};
use sparkure_server::services::{CleaningError, CleaningService};

fn booking(service_type: ServiceType, price: i64) -> CleaningForm {
    CleaningForm {
        service_type: Some(service_type),
        date: Some(Utc::now() + Duration::days(3)),
        address: Some("12 Harbour Road".to_string()),
        price: Some(Decimal::new(price, 0)),
        duration: Some(120),
        ..CleaningForm::default()
    }
}

fn status(to: CleaningStatus) -> CleaningPatch {
    CleaningPatch {
        status: Some(to),
        ..CleaningPatch::default()
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_employee_sees_booking_only_after_assignment() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;
    let bob = ctx.employee("Bob").await;
    let admin = ctx.admin().await;
    let service = CleaningService::new(&ctx.pool);

    let form = CleaningForm {
        service_type: Some(ServiceType::HomeCleaning),
        date: Some("2024-01-15T00:00:00Z".parse().unwrap()),
        address: Some("123 Main St".to_string()),
        ..CleaningForm::default()
    };
    let created = service.create(alice.actor(), form).await.unwrap();
    let id = created.cleaning.id;
    assert_eq!(created.cleaning.status, CleaningStatus::Scheduled);
    assert_eq!(created.cleaning.customer_id, alice.id);
    assert_eq!(created.cleaning.address, "123 Main St");

    let err = service.get(bob.actor(), id).await.unwrap_err();
    assert!(matches!(err, CleaningError::Policy(PolicyError::Forbidden(_))));

    service
        .update(
            admin.actor(),
            id,
            CleaningPatch {
                employee_id: Some(bob.id),
                status: Some(CleaningStatus::Assigned),
                ..CleaningPatch::default()
            },
        )
        .await
        .unwrap();

    let seen = service.get(bob.actor(), id).await.unwrap();
    assert_eq!(seen.cleaning.status, CleaningStatus::Assigned);
    assert_eq!(seen.cleaning.employee_id, Some(bob.id));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_full_booking_lifecycle() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;
    let bob = ctx.customer("Bob").await;
    let erin = ctx.employee("Erin").await;
    let admin = ctx.admin().await;
    let service = CleaningService::new(&ctx.pool);

    let created = service
        .create(alice.actor(), booking(ServiceType::DeepCleaning, 150))
        .await
        .unwrap();
    let id = created.cleaning.id;
    assert_eq!(created.cleaning.status, CleaningStatus::Scheduled);
    assert_eq!(created.cleaning.priority, Priority::Normal);
    assert_eq!(created.customer.id, alice.id);

    // Another customer cannot see it.
    let err = service.get(bob.actor(), id).await.unwrap_err();
    assert!(matches!(err, CleaningError::Policy(PolicyError::Forbidden(_))));

    // An unassigned employee cannot see it either.
    assert!(service.get(erin.actor(), id).await.is_err());

    // Assigning moves it to ASSIGNED.
    let assigned = service
        .update(
            admin.actor(),
            id,
            CleaningPatch {
                employee_id: Some(erin.id),
                ..CleaningPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(assigned.cleaning.status, CleaningStatus::Assigned);
    assert_eq!(assigned.employee.map(|e| e.id), Some(erin.id));

    let started = service
        .update(erin.actor(), id, status(CleaningStatus::InProgress))
        .await
        .unwrap();
    assert_eq!(started.cleaning.status, CleaningStatus::InProgress);

    let done = service
        .update(erin.actor(), id, status(CleaningStatus::Completed))
        .await
        .unwrap();
    assert_eq!(done.cleaning.status, CleaningStatus::Completed);

    // Terminal: even an admin cannot reopen it.
    let err = service
        .update(admin.actor(), id, status(CleaningStatus::Scheduled))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CleaningError::Policy(PolicyError::IllegalTransition(_))
    ));

    // Alice heard about every step.
    let (notes, _) = NotificationRepository::new(&ctx.pool)
        .list(alice.id, false, Page::new(None, None))
        .await
        .unwrap();
    let kinds: Vec<_> = notes.iter().map(|n| n.kind).collect();
    assert!(kinds.contains(&NotificationType::CleaningScheduled));
    assert!(kinds.contains(&NotificationType::CleaningStarted));
    assert!(kinds.contains(&NotificationType::CleaningCompleted));

    // And Erin about the assignment.
    let (notes, _) = NotificationRepository::new(&ctx.pool)
        .list(erin.id, false, Page::new(None, None))
        .await
        .unwrap();
    assert!(
        notes
            .iter()
            .any(|n| n.kind == NotificationType::CleaningScheduled)
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_listing_is_scoped_to_the_caller() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;
    let bob = ctx.customer("Bob").await;
    let service = CleaningService::new(&ctx.pool);

    for _ in 0..3 {
        service
            .create(alice.actor(), booking(ServiceType::HomeCleaning, 80))
            .await
            .unwrap();
    }
    service
        .create(bob.actor(), booking(ServiceType::OfficeCleaning, 200))
        .await
        .unwrap();

    let (items, info) = service
        .list(alice.actor(), None, Page::new(Some(2), Some(0)))
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(info.total_count, 3);
    assert!(info.has_more);
    assert!(items.iter().all(|c| c.cleaning.customer_id == alice.id));

    let (items, info) = service
        .list(alice.actor(), None, Page::new(Some(2), Some(2)))
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert!(!info.has_more);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_customer_may_cancel_or_delete_only_while_scheduled() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;
    let erin = ctx.employee("Erin").await;
    let admin = ctx.admin().await;
    let service = CleaningService::new(&ctx.pool);

    let first = service
        .create(alice.actor(), booking(ServiceType::MoveInOut, 300))
        .await
        .unwrap()
        .cleaning
        .id;
    let cancelled = service
        .update(alice.actor(), first, status(CleaningStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.cleaning.status, CleaningStatus::Cancelled);

    let second = service
        .create(alice.actor(), booking(ServiceType::MoveInOut, 300))
        .await
        .unwrap()
        .cleaning
        .id;
    service
        .update(
            admin.actor(),
            second,
            CleaningPatch {
                employee_id: Some(erin.id),
                ..CleaningPatch::default()
            },
        )
        .await
        .unwrap();

    // Assigned now, so the customer can neither delete nor cancel it.
    assert!(service.delete(alice.actor(), second).await.is_err());
    assert!(
        service
            .update(alice.actor(), second, status(CleaningStatus::Cancelled))
            .await
            .is_err()
    );

    // A fresh one can be deleted.
    let third = service
        .create(alice.actor(), booking(ServiceType::RegularCleaning, 60))
        .await
        .unwrap()
        .cleaning
        .id;
    service.delete(alice.actor(), third).await.unwrap();
    assert!(matches!(
        service.get(alice.actor(), third).await.unwrap_err(),
        CleaningError::NotFound
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_cancelled_booking_cannot_be_assigned() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;
    let bob = ctx.employee("Bob").await;
    let admin = ctx.admin().await;
    let service = CleaningService::new(&ctx.pool);

    let id = service
        .create(alice.actor(), booking(ServiceType::HomeCleaning, 80))
        .await
        .unwrap()
        .cleaning
        .id;
    service
        .update(alice.actor(), id, status(CleaningStatus::Cancelled))
        .await
        .unwrap();

    let err = service
        .update(
            admin.actor(),
            id,
            CleaningPatch {
                employee_id: Some(bob.id),
                ..CleaningPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CleaningError::Policy(PolicyError::NotAssignable(CleaningStatus::Cancelled))
    ));

    let seen = service.get(admin.actor(), id).await.unwrap();
    assert_eq!(seen.cleaning.employee_id, None);
    let (inbox, _) = NotificationRepository::new(&ctx.pool)
        .list(bob.id, false, Page::new(None, None))
        .await
        .unwrap();
    assert!(inbox.is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_delete_waits_for_concurrent_assignment() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;
    let bob = ctx.employee("Bob").await;
    let service = CleaningService::new(&ctx.pool);

    let id = service
        .create(alice.actor(), booking(ServiceType::HomeCleaning, 80))
        .await
        .unwrap()
        .cleaning
        .id;

    // Hold the row the way an admin assignment does, then let the delete start.
    let mut assignment = ctx.pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM cleanings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .execute(&mut *assignment)
        .await
        .unwrap();

    let pool = ctx.pool.clone();
    let actor = alice.actor();
    let delete = tokio::spawn(async move { CleaningService::new(&pool).delete(actor, id).await });
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    sqlx::query("UPDATE cleanings SET employee_id = $2, status = 'ASSIGNED' WHERE id = $1")
        .bind(id)
        .bind(bob.id)
        .execute(&mut *assignment)
        .await
        .unwrap();
    assignment.commit().await.unwrap();

    let err = delete.await.unwrap().unwrap_err();
    assert!(matches!(err, CleaningError::Policy(PolicyError::Forbidden(_))));

    let kept = service.get(alice.actor(), id).await.unwrap();
    assert_eq!(kept.cleaning.status, CleaningStatus::Assigned);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_history_summarizes_completed_bookings() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;
    let erin = ctx.employee("Erin").await;
    let admin = ctx.admin().await;
    let service = CleaningService::new(&ctx.pool);

    for (kind, price) in [
        (ServiceType::DeepCleaning, 150),
        (ServiceType::DeepCleaning, 100),
        (ServiceType::HomeCleaning, 75),
    ] {
        let id = service
            .create(alice.actor(), booking(kind, price))
            .await
            .unwrap()
            .cleaning
            .id;
        service
            .update(
                admin.actor(),
                id,
                CleaningPatch {
                    employee_id: Some(erin.id),
                    ..CleaningPatch::default()
                },
            )
            .await
            .unwrap();
        service
            .update(erin.actor(), id, status(CleaningStatus::InProgress))
            .await
            .unwrap();
        service
            .update(erin.actor(), id, status(CleaningStatus::Completed))
            .await
            .unwrap();
    }
    // Still scheduled; not part of history.
    service
        .create(alice.actor(), booking(ServiceType::HomeCleaning, 999))
        .await
        .unwrap();

    let (items, info, summary) = service
        .history(alice.id, CleaningFilter::default(), Page::new(None, None))
        .await
        .unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(info.total_count, 3);
    assert_eq!(summary.total_spent, Decimal::new(325, 0));
    let deep = summary
        .service_type_counts
        .iter()
        .find(|c| c.service_type == ServiceType::DeepCleaning)
        .map(|c| c.count);
    assert_eq!(deep, Some(2));

    let filter = CleaningFilter {
        service_type: Some(ServiceType::HomeCleaning),
        ..CleaningFilter::default()
    };
    let (_, _, summary) = service
        .history(alice.id, filter, Page::new(None, None))
        .await
        .unwrap();
    assert_eq!(summary.total_spent, Decimal::new(75, 0));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_empty_history_totals_zero() {
    let ctx = TestContext::new().await;
    let carol = ctx.customer("Carol").await;

    let (items, info, summary) = CleaningService::new(&ctx.pool)
        .history(carol.id, CleaningFilter::default(), Page::new(None, None))
        .await
        .unwrap();
    assert!(items.is_empty());
    assert_eq!(info.total_count, 0);
    assert_eq!(summary.total_spent, Decimal::ZERO);
    assert!(summary.service_type_counts.is_empty());
}
