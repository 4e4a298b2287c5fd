//! Bookmark (reading position) models and DTOs.

use chatstory_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `bookmarks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Bookmark {
    pub user_id: DbId,
    pub story_id: DbId,
    pub chapter_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A bookmark joined with story and chapter titles.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookmarkDetail {
    pub story_id: DbId,
    pub story_title: String,
    pub cover_url: Option<String>,
    pub chapter_id: Option<DbId>,
    pub chapter_title: Option<String>,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertBookmark {
    pub chapter_id: Option<DbId>,
}
