//! Repository for the `chat_sessions` and `chat_messages` tables.

use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::chat::{ChatMessage, ChatSession};

const SESSION_COLUMNS: &str = "id, user_id, story_id, title, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, session_id, role, content, command, created_at";

/// Provides persistence for assistant conversations.
pub struct ChatRepo;

impl ChatRepo {
    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    pub async fn create_session(
        pool: &PgPool,
        user_id: DbId,
        story_id: Option<DbId>,
        title: &str,
    ) -> Result<ChatSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_sessions (user_id, story_id, title)
             VALUES ($1, $2, $3)
             RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query_as::<_, ChatSession>(&query)
            .bind(user_id)
            .bind(story_id)
            .bind(title)
            .fetch_one(pool)
            .await
    }

    pub async fn find_session(pool: &PgPool, id: DbId) -> Result<Option<ChatSession>, sqlx::Error> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = $1");
        sqlx::query_as::<_, ChatSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's sessions, most recently active first.
    pub async fn list_sessions(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ChatSession>, sqlx::Error> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions
             WHERE user_id = $1
             ORDER BY updated_at DESC"
        );
        sqlx::query_as::<_, ChatSession>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a session and its messages.
    pub async fn delete_session(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM chat_messages WHERE session_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Append a message and bump the session's `updated_at`.
    pub async fn add_message(
        pool: &PgPool,
        session_id: DbId,
        role: &str,
        content: &str,
        command: Option<&serde_json::Value>,
    ) -> Result<ChatMessage, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO chat_messages (session_id, role, content, command)
             VALUES ($1, $2, $3, $4)
             RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, ChatMessage>(&query)
            .bind(session_id)
            .bind(role)
            .bind(content)
            .bind(command)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE chat_sessions SET updated_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Full history of a session, oldest first.
    pub async fn list_messages(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE session_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// The last `limit` messages of a session, oldest first.
    pub async fn recent_messages(
        pool: &PgPool,
        session_id: DbId,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM (
                SELECT {MESSAGE_COLUMNS} FROM chat_messages
                WHERE session_id = $1
                ORDER BY id DESC
                LIMIT $2
             ) recent
             ORDER BY id"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(session_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
