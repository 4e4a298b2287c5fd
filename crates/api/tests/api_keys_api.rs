//! HTTP-level tests for API key management and API key authentication.

mod common;

use axum::http::StatusCode;
use chatstory_core::api_keys::{generate_api_key, MAX_ACTIVE_KEYS_PER_USER};
use chatstory_db::repositories::ApiKeyRepo;
use common::{body_json, get_auth, get_with_header, post_json_auth, user_with_token};
use sqlx::PgPool;

async fn create_key(pool: &PgPool, token: &str, name: &str) -> axum::response::Response {
    let app = common::build_test_app(pool.clone());
    post_json_auth(app, "/api/v1/api-keys", serde_json::json!({ "name": name }), token).await
}

#[sqlx::test(migrations = "../db/migrations")]
async fn created_key_authenticates_and_records_usage(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "scripter").await;

    let response = create_key(&pool, &token, "publisher bot").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let plaintext = json["data"]["plaintext_key"].as_str().unwrap().to_string();
    assert!(plaintext.starts_with("csk_"));

    for _ in 0..2 {
        let app = common::build_test_app(pool.clone());
        let response = get_with_header(app, "/api/v1/stories", "x-api-key", &plaintext).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    // Bearer form works too.
    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/v1/stories", &plaintext).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let json = body_json(get_auth(app, "/api/v1/api-keys", &token).await).await;
    let key = &json["data"][0];
    assert_eq!(key["usage_count"], 3);
    assert!(!key["last_used_at"].is_null());
    assert!(key.get("key_hash").is_none());
    assert!(key.get("plaintext_key").is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn expired_key_returns_401(pool: PgPool) {
    let (user_id, _) = user_with_token(&pool, "scripter").await;
    let generated = generate_api_key();
    let yesterday = chrono::Utc::now() - chrono::Duration::days(1);
    ApiKeyRepo::create(
        &pool,
        user_id,
        "old",
        &generated.prefix,
        &generated.hash,
        Some(yesterday),
    )
    .await
    .unwrap();

    let app = common::build_test_app(pool);
    let response =
        get_with_header(app, "/api/v1/stories", "x-api-key", &generated.plaintext).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid or expired API key");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn inactive_key_returns_401(pool: PgPool) {
    let (user_id, _) = user_with_token(&pool, "scripter").await;
    let generated = generate_api_key();
    let key = ApiKeyRepo::create(&pool, user_id, "off", &generated.prefix, &generated.hash, None)
        .await
        .unwrap();
    sqlx::query("UPDATE api_keys SET is_active = false WHERE id = $1")
        .bind(key.id)
        .execute(&pool)
        .await
        .unwrap();

    let app = common::build_test_app(pool);
    let response =
        get_with_header(app, "/api/v1/stories", "x-api-key", &generated.plaintext).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_key_returns_401(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get_with_header(
        app,
        "/api/v1/stories",
        "x-api-key",
        "csk_0000000000000000000000000000000000000000",
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn eleventh_active_key_is_a_conflict(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "collector").await;

    for i in 0..MAX_ACTIVE_KEYS_PER_USER {
        let response = create_key(&pool, &token, &format!("key {i}")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = create_key(&pool, &token, "one too many").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"], "At most 10 active API keys are allowed");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn keys_cannot_manage_keys(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "scripter").await;
    let json = body_json(create_key(&pool, &token, "bot").await).await;
    let plaintext = json["data"]["plaintext_key"].as_str().unwrap().to_string();

    let app = common::build_test_app(pool);
    let response = get_with_header(app, "/api/v1/api-keys", "x-api-key", &plaintext).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn blank_key_name_is_rejected(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "scripter").await;

    let response = create_key(&pool, &token, "  ").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "name must not be empty");
}
