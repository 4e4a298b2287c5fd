//! General HTTP behaviour of the router that does not depend on the database.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::get;
use tower::ServiceExt;

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app(common::lazy_pool());
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = common::build_test_app(common::lazy_pool());
    let response = get(app, "/api/v1/auth/me").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn cors_preflight_allows_api_key_header() {
    let app = common::build_test_app(common::lazy_pool());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/stories")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "x-api-key")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn responses_are_gzipped_when_accepted() {
    let app = common::build_test_app(common::lazy_pool());
    let response = common::get_with_header(app, "/health", "accept-encoding", "gzip").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-encoding").unwrap(), "gzip");
}
