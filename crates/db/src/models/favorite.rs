//! Favourite (story like) models.

use chatstory_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A favourited story as listed for the current user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FavoriteStory {
    pub story_id: DbId,
    pub title: String,
    pub cover_url: Option<String>,
    pub author_username: String,
    pub favorited_at: Timestamp,
}
