//! Route definitions for the `/stories` resource.
//!
//! Also nests the story-scoped chapter, outline and character collections
//! under `/stories/{id}/...`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::uploads::UPLOAD_BODY_LIMIT;
use crate::handlers::{chapters, characters, outlines, stories};
use crate::state::AppState;

/// Routes mounted at `/stories`.
///
/// ```text
/// GET    /                          -> list
/// POST   /                          -> create
/// GET    /{id}                      -> get_by_id
/// PUT    /{id}                      -> update
/// DELETE /{id}                      -> delete
/// POST   /{id}/publish              -> publish
/// POST   /{id}/unpublish            -> unpublish
/// POST   /{id}/cover                -> upload_cover (multipart)
/// POST   /{id}/cover/generate       -> generate_cover
///
/// GET    /{id}/chapters             -> chapters::list_by_story
/// POST   /{id}/chapters             -> chapters::create
/// GET    /{id}/outlines             -> outlines::list_by_story
/// POST   /{id}/outlines             -> outlines::create
/// GET    /{id}/characters           -> characters::list_by_story
/// POST   /{id}/characters           -> characters::create
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(stories::list).post(stories::create))
        .route(
            "/{id}",
            get(stories::get_by_id)
                .put(stories::update)
                .delete(stories::delete),
        )
        .route("/{id}/publish", post(stories::publish))
        .route("/{id}/unpublish", post(stories::unpublish))
        .route(
            "/{id}/cover",
            post(stories::upload_cover).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/{id}/cover/generate", post(stories::generate_cover))
        .route(
            "/{id}/chapters",
            get(chapters::list_by_story).post(chapters::create),
        )
        .route(
            "/{id}/outlines",
            get(outlines::list_by_story).post(outlines::create),
        )
        .route(
            "/{id}/characters",
            get(characters::list_by_story).post(characters::create),
        )
}
