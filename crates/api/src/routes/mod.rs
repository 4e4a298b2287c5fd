pub mod api_keys;
pub mod auth;
pub mod chapters;
pub mod characters;
pub mod chat;
pub mod dialogues;
pub mod health;
pub mod library;
pub mod notifications;
pub mod outlines;
pub mod payments;
pub mod stories;
pub mod users;

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register | login | refresh | logout         session lifecycle
/// /auth/me                                          get, update profile
/// /auth/password                                    change password (PUT)
/// /auth/forgot-password | reset-password            password reset by email
/// /users/me/avatar                                  upload avatar (multipart)
///
/// /api-keys                                         list, create
/// /api-keys/{id}                                    delete
///
/// /stories                                          list mine, create
/// /stories/{id}                                     get, update, delete
/// /stories/{id}/publish | unpublish                 lifecycle (POST)
/// /stories/{id}/cover                               upload cover (multipart)
/// /stories/{id}/cover/generate                      AI cover (POST)
/// /stories/{id}/chapters                            list, create
/// /stories/{id}/outlines                            list, create
/// /stories/{id}/characters                          list, create
/// /chapters/{id}                                    get, update, delete
/// /chapters/{id}/publish                            publish (POST)
/// /chapters/{id}/dialogues                          list, create
/// /outlines/{id}                                    update, delete
/// /characters/{id}                                  get, update, delete
/// /dialogues/{id}                                   update, delete
///
/// /library/stories                                  browse (?q, genre, sort, limit, offset)
/// /library/stories/{id}                             detail (counts a view)
/// /library/stories/{id}/chapters/{chapter_id}       read chapter
/// /library/stories/{id}/comments                    list, create
/// /library/stories/{id}/favorite                    toggle (POST)
/// /library/stories/{id}/bookmark                    upsert, delete
/// /comments/{id}                                    delete
/// /favorites                                        my favourites
/// /bookmarks                                        my bookmarks
///
/// /notifications                                    list (?unread_only, limit, offset)
/// /notifications/unread-count                       unread count (GET)
/// /notifications/read-all                           mark all read (POST)
/// /notifications/{id}/read                          mark read (POST)
/// /notifications/{id}                               delete
///
/// /payments                                         my payments
/// /payments/badge                                   start badge purchase (POST)
/// /payments/vnpay-return | vnpay-ipn                gateway callbacks (public)
/// /badges/free                                      free badge grant (POST)
///
/// /chat/sessions                                    list, create
/// /chat/sessions/{id}                               delete
/// /chat/sessions/{id}/messages                      history, send
/// /chat/commands/execute                            run an assistant command (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/api-keys", api_keys::router())
        .nest("/stories", stories::router())
        .nest("/chapters", chapters::router())
        .nest("/outlines", outlines::router())
        .nest("/characters", characters::router())
        .nest("/dialogues", dialogues::router())
        .nest("/library", library::router())
        .route("/comments/{id}", delete(handlers::comments::delete))
        .route("/favorites", get(handlers::favorites::list_mine))
        .route("/bookmarks", get(handlers::bookmarks::list_mine))
        .nest("/notifications", notifications::router())
        .nest("/payments", payments::router())
        .nest("/badges", payments::badge_router())
        .nest("/chat", chat::router())
}
