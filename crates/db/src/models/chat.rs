//! Assistant chat session and message models.

use chatstory_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// A row from the `chat_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatSession {
    pub id: DbId,
    pub user_id: DbId,
    pub story_id: Option<DbId>,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChatSession {
    pub story_id: Option<DbId>,
    pub title: Option<String>,
}

/// A row from the `chat_messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatMessage {
    pub id: DbId,
    pub session_id: DbId,
    pub role: String,
    pub content: String,
    /// Parsed assistant command, serialised as `{command, payload}`.
    pub command: Option<serde_json::Value>,
    pub created_at: Timestamp,
}
