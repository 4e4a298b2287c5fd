//! Integration tests for API key lookup and usage tracking.

use chatstory_core::api_keys::{generate_api_key, hash_api_key};
use chatstory_core::types::Timestamp;
use chatstory_db::models::user::CreateUser;
use chatstory_db::repositories::{ApiKeyRepo, UserRepo};
use sqlx::PgPool;

async fn owner(pool: &PgPool) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            username: "scripter".to_string(),
            email: "scripter@example.com".to_string(),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

/// Store a fresh key and return `(key_id, plaintext)`.
async fn issue(pool: &PgPool, user_id: i64, expires_at: Option<Timestamp>) -> (i64, String) {
    let generated = generate_api_key();
    let key = ApiKeyRepo::create(
        pool,
        user_id,
        "ci",
        &generated.prefix,
        &generated.hash,
        expires_at,
    )
    .await
    .unwrap();
    (key.id, generated.plaintext)
}

#[sqlx::test(migrations = "./migrations")]
async fn valid_key_resolves_to_its_owner(pool: PgPool) {
    let user = owner(&pool).await;
    let (key_id, plaintext) = issue(&pool, user, None).await;

    let found = ApiKeyRepo::find_owner_by_hash(&pool, &hash_api_key(&plaintext))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(found.key_id, key_id);
    assert_eq!(found.user_id, user);
    assert_eq!(found.role, "user");
}

#[sqlx::test(migrations = "./migrations")]
async fn expired_key_is_not_found(pool: PgPool) {
    let user = owner(&pool).await;
    let yesterday = chrono::Utc::now() - chrono::Duration::days(1);
    let (_, plaintext) = issue(&pool, user, Some(yesterday)).await;

    let found = ApiKeyRepo::find_owner_by_hash(&pool, &hash_api_key(&plaintext))
        .await
        .unwrap();
    assert!(found.is_none());
    assert_eq!(ApiKeyRepo::count_active(&pool, user).await.unwrap(), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn revoked_key_and_disabled_owner_are_not_found(pool: PgPool) {
    let user = owner(&pool).await;
    let (revoked_id, revoked) = issue(&pool, user, None).await;
    let (_, live) = issue(&pool, user, None).await;

    sqlx::query("UPDATE api_keys SET is_active = false WHERE id = $1")
        .bind(revoked_id)
        .execute(&pool)
        .await
        .unwrap();
    assert!(ApiKeyRepo::find_owner_by_hash(&pool, &hash_api_key(&revoked))
        .await
        .unwrap()
        .is_none());

    sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
        .bind(user)
        .execute(&pool)
        .await
        .unwrap();
    assert!(ApiKeyRepo::find_owner_by_hash(&pool, &hash_api_key(&live))
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn touch_usage_counts_and_stamps(pool: PgPool) {
    let user = owner(&pool).await;
    let (key_id, _) = issue(&pool, user, None).await;

    ApiKeyRepo::touch_usage(&pool, key_id).await.unwrap();
    ApiKeyRepo::touch_usage(&pool, key_id).await.unwrap();

    let keys = ApiKeyRepo::list_by_user(&pool, user).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].usage_count, 2);
    assert!(keys[0].last_used_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_is_scoped_to_the_owner(pool: PgPool) {
    let user = owner(&pool).await;
    let (key_id, _) = issue(&pool, user, None).await;

    assert!(!ApiKeyRepo::delete(&pool, key_id, user + 1).await.unwrap());
    assert!(ApiKeyRepo::delete(&pool, key_id, user).await.unwrap());
    assert!(ApiKeyRepo::list_by_user(&pool, user).await.unwrap().is_empty());
}
