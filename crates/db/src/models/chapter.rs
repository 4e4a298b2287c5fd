//! Chapter entity model and DTOs.

use chatstory_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `chapters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Chapter {
    pub id: DbId,
    pub story_id: DbId,
    pub title: String,
    pub summary: Option<String>,
    pub status: String,
    pub chapter_order: i32,
    pub publish_order: Option<i32>,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a chapter. `chapter_order` is assigned by the repository.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateChapter {
    pub title: String,
    pub summary: Option<String>,
}

/// DTO for updating a chapter. All fields are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateChapter {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub chapter_order: Option<i32>,
}
