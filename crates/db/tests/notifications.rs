//! Integration tests for the notification inbox.

use chatstory_core::types::Timestamp;
use chatstory_db::models::notification::CreateNotification;
use chatstory_db::models::user::CreateUser;
use chatstory_db::repositories::{NotificationRepo, UserRepo};
use sqlx::PgPool;

async fn new_user(pool: &PgPool, username: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn notify(pool: &PgPool, user_id: i64, title: &str) -> i64 {
    NotificationRepo::create(
        pool,
        &CreateNotification {
            user_id,
            kind: "comment".to_string(),
            title: title.to_string(),
            message: "someone commented on your story".to_string(),
            story_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

#[sqlx::test(migrations = "./migrations")]
async fn mark_read_is_idempotent(pool: PgPool) {
    let user = new_user(&pool, "author").await;
    let id = notify(&pool, user, "New comment").await;

    assert!(NotificationRepo::mark_read(&pool, id, user).await.unwrap());
    let first: Option<Timestamp> =
        sqlx::query_scalar("SELECT read_at FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();

    assert!(NotificationRepo::mark_read(&pool, id, user).await.unwrap());
    let second: Option<Timestamp> =
        sqlx::query_scalar("SELECT read_at FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(NotificationRepo::unread_count(&pool, user).await.unwrap(), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn mark_read_ignores_other_users(pool: PgPool) {
    let owner = new_user(&pool, "owner").await;
    let stranger = new_user(&pool, "stranger").await;
    let id = notify(&pool, owner, "Private").await;

    assert!(!NotificationRepo::mark_read(&pool, id, stranger).await.unwrap());
    assert_eq!(NotificationRepo::unread_count(&pool, owner).await.unwrap(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn mark_all_read_clears_the_unread_count(pool: PgPool) {
    let user = new_user(&pool, "reader").await;
    notify(&pool, user, "One").await;
    notify(&pool, user, "Two").await;
    assert_eq!(NotificationRepo::unread_count(&pool, user).await.unwrap(), 2);

    NotificationRepo::mark_all_read(&pool, user).await.unwrap();

    assert_eq!(NotificationRepo::unread_count(&pool, user).await.unwrap(), 0);
    let unread = NotificationRepo::list_for_user(&pool, user, true, 20, 0).await.unwrap();
    assert!(unread.is_empty());
}
