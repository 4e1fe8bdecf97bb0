//! PostgreSQL Repository Integration Tests
#![cfg(feature = "postgres")]

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use loopync::domain::friendship::{FriendRequestOutcome, FriendshipRepository, FriendshipStatus};
use loopync::domain::messaging::{MessageContent, ThreadRepository};
use loopync::domain::shared::{DomainError, UserId, UserPair};
use loopync::domain::user::{User, UserRepository};
use loopync::infrastructure::persistence::{
    create_pool, run_migrations, DatabaseConfig, PgFriendshipRepository, PgThreadRepository,
    PgUserRepository,
};

#[tokio::test]
#[ignore] // Requires database
async fn test_user_uniqueness() {
    let pool = setup_database().await;
    let repo = PgUserRepository::new(pool.clone());
    let alice = test_user("alice");

    assert_ok!(repo.insert(alice.clone()).await);
    let found = repo.find_by_email(&alice.email.to_uppercase()).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(alice.id.clone()));

    let mut clash = test_user("other");
    clash.email = alice.email.clone();
    let err = assert_err!(repo.insert(clash).await);
    assert!(matches!(err, DomainError::Conflict(_)));

    cleanup_database(pool).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_concurrent_reciprocal_requests() {
    let pool = setup_database().await;
    let users = PgUserRepository::new(pool.clone());
    let friendships = Arc::new(PgFriendshipRepository::new(pool.clone()));
    let a = test_user("a");
    let b = test_user("b");
    users.insert(a.clone()).await.expect("Failed to insert user");
    users.insert(b.clone()).await.expect("Failed to insert user");

    let (first, second) = tokio::join!(
        friendships.request(&a.id, &b.id),
        friendships.request(&b.id, &a.id)
    );
    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|o| o.as_str());
    assert_eq!(
        outcomes,
        vec![FriendRequestOutcome::NowFriends, FriendRequestOutcome::Pending]
    );

    assert!(friendships.are_friends(&a.id, &b.id).await.unwrap());
    assert_eq!(friendships.friends_of(&a.id).await.unwrap(), vec![b.id.clone()]);
    assert_eq!(friendships.friends_of(&b.id).await.unwrap(), vec![a.id.clone()]);
    assert!(friendships.pending_sent(&a.id).await.unwrap().is_empty());
    assert!(friendships.pending_received(&a.id).await.unwrap().is_empty());

    assert!(friendships.remove(&b.id, &a.id).await.unwrap());
    assert!(!friendships.remove(&b.id, &a.id).await.unwrap());
    assert_eq!(
        friendships.status(&a.id, &b.id).await.unwrap(),
        FriendshipStatus::None
    );

    cleanup_database(pool).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_thread_log() {
    let pool = setup_database().await;
    let users = PgUserRepository::new(pool.clone());
    let threads = Arc::new(PgThreadRepository::new(pool.clone()));
    let a = test_user("a");
    let b = test_user("b");
    users.insert(a.clone()).await.expect("Failed to insert user");
    users.insert(b.clone()).await.expect("Failed to insert user");
    let pair = UserPair::new(a.id.clone(), b.id.clone()).unwrap();

    let (first, second) = tokio::join!(
        threads.get_or_create_thread(&pair),
        threads.get_or_create_thread(&pair)
    );
    let (first, created_first) = first.unwrap();
    let (second, created_second) = second.unwrap();
    assert_eq!(first.id, second.id);
    assert!(created_first ^ created_second);

    let mut handles = Vec::new();
    for i in 0..10 {
        let threads = threads.clone();
        let thread_id = first.id;
        let sender = if i % 2 == 0 { a.id.clone() } else { b.id.clone() };
        handles.push(tokio::spawn(async move {
            threads
                .append_message(&thread_id, &sender, text(&format!("message {}", i)))
                .await
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let messages = threads.messages_after(&first.id, 0, 100).await.unwrap();
    let seqs: Vec<u64> = messages.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, (1..=10).collect::<Vec<u64>>());
    assert!(messages.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));

    let page = threads.messages_after(&first.id, 8, 100).await.unwrap();
    assert_eq!(page.len(), 2);

    let up_to = threads
        .mark_read(&first.id, &b.id, &messages[9].id)
        .await
        .unwrap();
    assert_eq!(up_to, 10);
    // An older message never moves the cursor back
    let up_to = threads
        .mark_read(&first.id, &b.id, &messages[2].id)
        .await
        .unwrap();
    assert_eq!(up_to, 10);
    assert_eq!(threads.unread_count(&first.id, &b.id).await.unwrap(), 0);

    cleanup_database(pool).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_mixed_case_ids() {
    let pool = setup_database().await;
    let users = PgUserRepository::new(pool.clone());
    let friendships = PgFriendshipRepository::new(pool.clone());
    let threads = PgThreadRepository::new(pool.clone());
    // Byte order puts "Bob" first; most locale collations put "alice" first
    let bob = test_user("Bob");
    let alice = test_user("alice");
    users.insert(bob.clone()).await.expect("Failed to insert user");
    users.insert(alice.clone()).await.expect("Failed to insert user");

    assert_eq!(
        assert_ok!(friendships.request(&bob.id, &alice.id).await),
        FriendRequestOutcome::Pending
    );
    assert_ok!(friendships.accept(&alice.id, &bob.id).await);
    assert!(friendships.are_friends(&alice.id, &bob.id).await.unwrap());

    let pair = UserPair::new(alice.id.clone(), bob.id.clone()).unwrap();
    assert_eq!(pair.low(), &bob.id);
    let (thread, created) = assert_ok!(threads.get_or_create_thread(&pair).await);
    assert!(created);
    let message = assert_ok!(
        threads
            .append_message(&thread.id, &alice.id, text("hi Bob"))
            .await
    );
    assert_eq!(message.seq, 1);
    assert_eq!(
        threads.threads_for_user(&bob.id, 0, 10).await.unwrap()[0].id,
        thread.id
    );

    cleanup_database(pool).await;
}

fn test_user(name: &str) -> User {
    let suffix = Uuid::new_v4().simple().to_string();
    User {
        id: UserId::new(format!("pgtest-{}-{}", name, suffix)),
        name: name.to_string(),
        handle: format!("{}_{}", name, &suffix[..12]),
        email: format!("{}-{}@example.com", name, suffix),
        phone: None,
        password_hash: String::new(),
        created_at: Utc::now(),
    }
}

fn text(body: &str) -> MessageContent {
    MessageContent {
        text: Some(body.to_string()),
        media_url: None,
        mime_type: None,
    }
}

async fn setup_database() -> PgPool {
    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost/loopync_test".to_string());

    let pool = create_pool(&DatabaseConfig::new(db_url, 5))
        .await
        .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

async fn cleanup_database(pool: PgPool) {
    // Clean up test data, children first
    let statements = [
        "DELETE FROM dm_read_cursors WHERE user_id LIKE 'pgtest-%'",
        "DELETE FROM dm_messages WHERE sender_id LIKE 'pgtest-%'",
        "DELETE FROM dm_threads WHERE user_low LIKE 'pgtest-%'",
        "DELETE FROM friend_requests WHERE from_user_id LIKE 'pgtest-%'",
        "DELETE FROM friendships WHERE user_low LIKE 'pgtest-%'",
        "DELETE FROM users WHERE id LIKE 'pgtest-%'",
    ];
    for sql in statements {
        sqlx::query(sql).execute(&pool).await.ok();
    }
    pool.close().await;
}
