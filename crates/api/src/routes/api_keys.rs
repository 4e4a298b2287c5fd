//! Route definitions for the `/api-keys` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::api_keys;
use crate::state::AppState;

/// Routes mounted at `/api-keys`.
///
/// ```text
/// GET    /      -> list_api_keys
/// POST   /      -> create_api_key
/// DELETE /{id}  -> delete_api_key
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route("/{id}", delete(api_keys::delete_api_key))
}
