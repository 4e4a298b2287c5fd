//! HTTP-level tests for authentication and request validation.
//!
//! Requests rejected before the database is reached run against a lazy pool;
//! the rest use a migrated test database.

mod common;

use axum::http::StatusCode;
use chatstory_api::auth::jwt::{generate_access_token, JwtConfig};
use common::{
    body_json, get, get_auth, get_with_header, post_json, user_with_token, TEST_JWT_SECRET,
};
use sqlx::PgPool;

#[tokio::test]
async fn protected_route_without_credentials_returns_401() {
    let app = common::build_test_app(common::lazy_pool());
    let response = get(app, "/api/v1/auth/me").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_bearer_token_returns_401() {
    let app = common::build_test_app(common::lazy_pool());
    let response = get_auth(app, "/api/v1/stories", "not.a.jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid or expired token");
}

#[tokio::test]
async fn malformed_authorization_header_returns_401() {
    let app = common::build_test_app(common::lazy_pool());
    let response =
        get_with_header(app, "/api/v1/notifications", "authorization", "Basic dXNlcjpwdw==").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_returns_401() {
    let foreign = JwtConfig {
        secret: format!("{TEST_JWT_SECRET}-other"),
        access_token_expiry_mins: 15,
        refresh_token_expiry_days: 7,
    };
    let token = generate_access_token(1, "user", &foreign).unwrap();

    let app = common::build_test_app(common::lazy_pool());
    let response = get_auth(app, "/api/v1/chat/sessions", &token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_returns_401() {
    let expired = JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        access_token_expiry_mins: -10,
        refresh_token_expiry_days: 7,
    };
    let token = generate_access_token(1, "user", &expired).unwrap();

    let app = common::build_test_app(common::lazy_pool());
    let response = get_auth(app, "/api/v1/auth/me", &token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_with_bad_token_returns_401() {
    let app = common::build_test_app(common::lazy_pool());
    let response =
        get_with_header(app, "/api/v1/favorites", "cookie", "chatstory_session=bogus").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_invalid_username() {
    let app = common::build_test_app(common::lazy_pool());
    let body = serde_json::json!({
        "username": "no spaces allowed",
        "email": "writer@example.com",
        "password": "long-enough-password",
    });
    let response = post_json(app, "/api/v1/auth/register", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn register_rejects_short_password() {
    let app = common::build_test_app(common::lazy_pool());
    let body = serde_json::json!({
        "username": "writer_01",
        "email": "writer@example.com",
        "password": "short",
    });
    let response = post_json(app, "/api/v1/auth/register", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forgot_password_rejects_malformed_email() {
    let app = common::build_test_app(common::lazy_pool());
    let body = serde_json::json!({ "email": "not-an-email" });
    let response = post_json(app, "/api/v1/auth/forgot-password", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_password_rejects_weak_password() {
    let app = common::build_test_app(common::lazy_pool());
    let body = serde_json::json!({ "token": "abc", "new_password": "123" });
    let response = post_json(app, "/api/v1/auth/reset-password", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn register_then_login_returns_tokens(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let body = serde_json::json!({
        "username": "new_writer",
        "email": "writer@example.com",
        "password": "correct-horse-battery"
    });
    let response = post_json(app, "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().get("set-cookie").is_some());

    let app = common::build_test_app(pool.clone());
    let body = serde_json::json!({
        "login": "WRITER@example.com",
        "password": "correct-horse-battery"
    });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user"]["username"], "new_writer");
    assert_eq!(json["user"]["role"], "user");

    let token = json["access_token"].as_str().unwrap();
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/auth/me", token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_username_is_a_conflict(pool: PgPool) {
    common::create_user(&pool, "taken").await;

    let app = common::build_test_app(pool);
    let body = serde_json::json!({
        "username": "taken",
        "email": "someone-else@example.com",
        "password": "correct-horse-battery"
    });
    let response = post_json(app, "/api/v1/auth/register", body).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn session_cookie_authenticates(pool: PgPool) {
    let (user_id, token) = user_with_token(&pool, "cookie_user").await;

    let app = common::build_test_app(pool);
    let response = get_with_header(
        app,
        "/api/v1/auth/me",
        "cookie",
        &format!("chatstory_session={token}"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], user_id);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn deactivated_account_token_returns_401(pool: PgPool) {
    let (user_id, token) = user_with_token(&pool, "banned").await;
    sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/stories", &token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Account is disabled");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn token_for_a_deleted_user_returns_401(pool: PgPool) {
    let token = common::access_token(987_654, "user");

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/auth/me", &token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn role_comes_from_the_account_not_the_token(pool: PgPool) {
    let user_id = common::create_user(&pool, "pretender").await;
    let token = common::access_token(user_id, "admin");
    let (_, other_token) = user_with_token(&pool, "victim").await;

    // Only an admin may delete another reader's comment on another author's story.
    let app = common::build_test_app(pool.clone());
    let response = common::post_json_auth(
        app,
        "/api/v1/stories",
        serde_json::json!({ "title": "Guarded" }),
        &other_token,
    )
    .await;
    let story_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let app = common::build_test_app(pool.clone());
    common::post_auth(app, &format!("/api/v1/stories/{story_id}/publish"), &other_token).await;
    let app = common::build_test_app(pool.clone());
    let response = common::post_json_auth(
        app,
        &format!("/api/v1/library/stories/{story_id}/comments"),
        serde_json::json!({ "content": "Lovely" }),
        &other_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let comment_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool);
    let response =
        common::delete_auth(app, &format!("/api/v1/comments/{comment_id}"), &token).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
