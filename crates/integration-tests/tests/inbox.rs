//! Chat, notifications and the contact form.
//!
//! Requires `SPARKURE_TEST_DATABASE_URL`.

#![allow(clippy::unwrap_used)]

use sparkure_core::{ChatMessageType, NotificationType, Page};
use sparkure_integration_tests::TestContext;
use sparkure_server::db::{ContactRepository, NotificationRepository, RepositoryError};
use sparkure_server::models::NewContactSubmission;
use sparkure_server::services::{ChatError, ChatService};

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_direct_room_is_reused() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;
    let erin = ctx.employee("Erin").await;
    let chat = ChatService::new(&ctx.pool);

    let first = chat.open_direct(alice.id, erin.id).await.unwrap();
    let second = chat.open_direct(erin.id, alice.id).await.unwrap();
    assert_eq!(first.id, second.id);

    let err = chat.open_direct(alice.id, alice.id).await.unwrap_err();
    assert!(matches!(err, ChatError::SelfChat));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_messages_reach_members_only() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;
    let erin = ctx.employee("Erin").await;
    let mallory = ctx.customer("Mallory").await;
    let chat = ChatService::new(&ctx.pool);

    let room = chat.open_direct(alice.id, erin.id).await.unwrap().id;
    let sent = chat
        .send(&alice, room, "  Is 9am fine?  ", ChatMessageType::Text)
        .await
        .unwrap();
    assert_eq!(sent.content, "Is 9am fine?");
    assert_eq!(sent.sender.id, alice.id);

    // Erin sees the room with its latest message.
    let rooms = chat.rooms(erin.id).await.unwrap();
    let overview = rooms.iter().find(|r| r.room.id == room).unwrap();
    assert_eq!(overview.room.last_message.as_deref(), Some("Is 9am fine?"));
    assert_eq!(overview.members.len(), 2);
    assert_eq!(
        overview.latest_message.as_ref().map(|m| m.id),
        Some(sent.id)
    );

    // And is notified.
    let (notes, _) = NotificationRepository::new(&ctx.pool)
        .list(erin.id, true, Page::new(None, None))
        .await
        .unwrap();
    assert!(
        notes
            .iter()
            .any(|n| n.kind == NotificationType::MessageReceived)
    );

    // Outsiders get nothing and cannot post.
    assert!(chat.messages(mallory.id, room).await.unwrap().is_empty());
    let err = chat
        .send(&mallory, room, "hello", ChatMessageType::Text)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NotMember));

    let err = chat
        .send(&alice, room, "   ", ChatMessageType::Text)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::EmptyMessage));

    // Reading marks Alice's message read for Erin.
    assert_eq!(chat.mark_read(erin.id, room).await.unwrap(), 1);
    let messages = chat.messages(erin.id, room).await.unwrap();
    assert!(messages.iter().all(|m| m.is_read));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_notification_inbox() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;
    let bob = ctx.customer("Bob").await;
    let erin = ctx.employee("Erin").await;
    let chat = ChatService::new(&ctx.pool);
    let repo = NotificationRepository::new(&ctx.pool);

    let room = chat.open_direct(erin.id, alice.id).await.unwrap().id;
    for text in ["one", "two", "three"] {
        chat.send(&erin, room, text, ChatMessageType::Text)
            .await
            .unwrap();
    }

    let (unread, total) = repo.list(alice.id, true, Page::new(None, None)).await.unwrap();
    assert_eq!(total, 3);

    let first = unread.first().unwrap().id;
    assert_eq!(repo.mark_read(alice.id, &[first]).await.unwrap(), 1);
    let (_, total) = repo.list(alice.id, true, Page::new(None, None)).await.unwrap();
    assert_eq!(total, 2);

    assert_eq!(repo.mark_all_read(alice.id).await.unwrap(), 2);
    let (_, total) = repo.list(alice.id, true, Page::new(None, None)).await.unwrap();
    assert_eq!(total, 0);

    // Someone else's notification looks missing.
    let err = repo.delete(bob.id, first).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));
    repo.delete(alice.id, first).await.unwrap();
    let (_, total) = repo.list(alice.id, false, Page::new(None, None)).await.unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SPARKURE_TEST_DATABASE_URL)"]
async fn test_contact_submission_is_stored_against_caller() {
    let ctx = TestContext::new().await;
    let alice = ctx.customer("Alice").await;

    let form = NewContactSubmission {
        first_name: " Alice ".to_string(),
        last_name: "Liddell".to_string(),
        email: "alice@example.com".to_string(),
        phone: "5550100200".to_string(),
        message: "Do you clean ovens as well?".to_string(),
    }
    .validated()
    .unwrap();

    let stored = ContactRepository::new(&ctx.pool)
        .create(alice.id, &form)
        .await
        .unwrap();
    assert_eq!(stored.user_id, Some(alice.id));
    assert_eq!(stored.first_name, "Alice");
}
