//! Outline entity model and DTOs.

use chatstory_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `outlines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Outline {
    pub id: DbId,
    pub story_id: DbId,
    pub title: String,
    pub content: Option<String>,
    pub position: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOutline {
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOutline {
    pub title: Option<String>,
    pub content: Option<String>,
    pub position: Option<i32>,
}
