//! Comment entity model and DTOs.

use chatstory_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `comments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: DbId,
    pub story_id: DbId,
    pub user_id: DbId,
    pub content: String,
    pub created_at: Timestamp,
}

/// A comment joined with its author for display.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommentWithAuthor {
    pub id: DbId,
    pub story_id: DbId,
    pub user_id: DbId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub has_badge: bool,
    pub content: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub content: String,
}
