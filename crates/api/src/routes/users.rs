//! Route definitions for the `/users` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::auth;
use crate::handlers::uploads::UPLOAD_BODY_LIMIT;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// POST /me/avatar  -> upload_avatar (multipart)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/me/avatar",
        post(auth::upload_avatar).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
    )
}
