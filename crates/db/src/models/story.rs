//! Story entity model and DTOs.

use chatstory_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `stories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Story {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub cover_url: Option<String>,
    #[serde(skip_serializing)]
    pub cover_file_id: Option<String>,
    pub status: String,
    pub publish_order: Option<i64>,
    pub view_count: i64,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a story. New stories always start as drafts.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStory {
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
}

/// DTO for updating a story. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStory {
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
}

/// A published story as shown in the public library listing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LibraryStory {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub cover_url: Option<String>,
    pub view_count: i64,
    pub published_at: Option<Timestamp>,
    pub author_id: DbId,
    pub author_username: String,
    pub author_has_badge: bool,
    pub favorite_count: i64,
    pub chapter_count: i64,
}

/// Sort orders for the public library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibrarySort {
    /// Most recently published first (by `publish_order`).
    #[default]
    Latest,
    /// Most viewed first.
    Popular,
}

/// Filters for the public library listing.
#[derive(Debug, Clone, Default)]
pub struct LibraryFilter {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub sort: LibrarySort,
    pub limit: i64,
    pub offset: i64,
}
