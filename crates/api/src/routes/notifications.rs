//! Route definitions for the `/notifications` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /              -> list (?unread_only, limit, offset)
/// GET    /unread-count  -> unread_count
/// POST   /read-all      -> mark_all_read
/// POST   /{id}/read     -> mark_read
/// DELETE /{id}          -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/{id}/read", post(notifications::mark_read))
        .route("/{id}", delete(notifications::delete))
}
