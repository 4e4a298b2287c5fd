//! Dialogue entity model and DTOs.

use chatstory_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `dialogues` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dialogue {
    pub id: DbId,
    pub chapter_id: DbId,
    pub character_id: Option<DbId>,
    pub kind: String,
    pub content: String,
    pub position: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A dialogue joined with its speaking character's name, for readers.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DialogueWithCharacter {
    pub id: DbId,
    pub character_id: Option<DbId>,
    pub character_name: Option<String>,
    pub character_avatar_url: Option<String>,
    pub kind: String,
    pub content: String,
    pub position: i32,
}

/// DTO for creating a dialogue. `kind` defaults to `dialogue`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDialogue {
    pub character_id: Option<DbId>,
    pub kind: Option<String>,
    pub content: String,
}

/// DTO for updating a dialogue.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDialogue {
    pub character_id: Option<DbId>,
    pub kind: Option<String>,
    pub content: Option<String>,
    pub position: Option<i32>,
}
