//! Route definitions for the `/outlines` resource.

use axum::routing::put;
use axum::Router;

use crate::handlers::outlines;
use crate::state::AppState;

/// Routes mounted at `/outlines`.
///
/// ```text
/// PUT    /{id}  -> update
/// DELETE /{id}  -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", put(outlines::update).delete(outlines::delete))
}
