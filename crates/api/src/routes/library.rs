//! Route definitions for the public `/library`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{bookmarks, comments, favorites, library};
use crate::state::AppState;

/// Routes mounted at `/library`.
///
/// ```text
/// GET    /stories                            -> list_stories
/// GET    /stories/{id}                       -> get_story
/// GET    /stories/{id}/chapters/{chapter_id} -> read_chapter
/// GET    /stories/{id}/comments              -> comments::list
/// POST   /stories/{id}/comments              -> comments::create (requires auth)
/// POST   /stories/{id}/favorite              -> favorites::toggle (requires auth)
/// PUT    /stories/{id}/bookmark              -> bookmarks::upsert (requires auth)
/// DELETE /stories/{id}/bookmark              -> bookmarks::delete (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories", get(library::list_stories))
        .route("/stories/{id}", get(library::get_story))
        .route(
            "/stories/{id}/chapters/{chapter_id}",
            get(library::read_chapter),
        )
        .route(
            "/stories/{id}/comments",
            get(comments::list).post(comments::create),
        )
        .route("/stories/{id}/favorite", post(favorites::toggle))
        .route(
            "/stories/{id}/bookmark",
            put(bookmarks::upsert).delete(bookmarks::delete),
        )
}
