//! Route definitions for the `/chat` assistant.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::chat;
use crate::state::AppState;

/// Routes mounted at `/chat`.
///
/// ```text
/// GET    /sessions                -> list_sessions
/// POST   /sessions                -> create_session
/// DELETE /sessions/{id}           -> delete_session
/// GET    /sessions/{id}/messages  -> list_messages
/// POST   /sessions/{id}/messages  -> send_message
/// POST   /commands/execute        -> execute_command
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            get(chat::list_sessions).post(chat::create_session),
        )
        .route("/sessions/{id}", delete(chat::delete_session))
        .route(
            "/sessions/{id}/messages",
            get(chat::list_messages).post(chat::send_message),
        )
        .route("/commands/execute", post(chat::execute_command))
}
