//! Route definitions for the `/chapters` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{chapters, dialogues};
use crate::state::AppState;

/// Routes mounted at `/chapters`.
///
/// ```text
/// GET    /{id}            -> get_by_id
/// PUT    /{id}            -> update
/// DELETE /{id}            -> delete
/// POST   /{id}/publish    -> publish
/// GET    /{id}/dialogues  -> dialogues::list_by_chapter
/// POST   /{id}/dialogues  -> dialogues::create
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(chapters::get_by_id)
                .put(chapters::update)
                .delete(chapters::delete),
        )
        .route("/{id}/publish", post(chapters::publish))
        .route(
            "/{id}/dialogues",
            get(dialogues::list_by_chapter).post(dialogues::create),
        )
}
