//! Character entity model and DTOs.

use chatstory_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `characters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Character {
    pub id: DbId,
    pub story_id: DbId,
    pub name: String,
    pub role: String,
    pub description: Option<String>,
    pub gender: Option<String>,
    pub personality: Option<String>,
    pub appearance: Option<String>,
    pub background: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a character. `role` defaults to `supporting`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCharacter {
    pub name: String,
    pub role: Option<String>,
    pub description: Option<String>,
    pub gender: Option<String>,
    pub personality: Option<String>,
    pub appearance: Option<String>,
    pub background: Option<String>,
    pub avatar_url: Option<String>,
}

/// DTO for updating a character. All fields are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCharacter {
    pub name: Option<String>,
    pub role: Option<String>,
    pub description: Option<String>,
    pub gender: Option<String>,
    pub personality: Option<String>,
    pub appearance: Option<String>,
    pub background: Option<String>,
    pub avatar_url: Option<String>,
}
