//! Route definitions for the `/dialogues` resource.

use axum::routing::put;
use axum::Router;

use crate::handlers::dialogues;
use crate::state::AppState;

/// Routes mounted at `/dialogues`.
///
/// ```text
/// PUT    /{id}  -> update
/// DELETE /{id}  -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", put(dialogues::update).delete(dialogues::delete))
}
