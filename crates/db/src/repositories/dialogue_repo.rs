//! Repository for the `dialogues` table.

use chatstory_core::story::DIALOGUE_SPEECH;
use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::dialogue::{CreateDialogue, Dialogue, DialogueWithCharacter, UpdateDialogue};

const COLUMNS: &str = "id, chapter_id, character_id, kind, content, position, created_at, updated_at";

const WITH_CHARACTER_COLUMNS: &str = "\
    d.id, d.character_id, c.name AS character_name, c.avatar_url AS character_avatar_url, \
    d.kind, d.content, d.position";

/// Provides ordered CRUD for the lines of a chapter.
pub struct DialogueRepo;

impl DialogueRepo {
    /// Append a line at the end of the chapter.
    pub async fn create(
        pool: &PgPool,
        chapter_id: DbId,
        input: &CreateDialogue,
    ) -> Result<Dialogue, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM chapters WHERE id = $1 FOR UPDATE")
            .bind(chapter_id)
            .execute(&mut *tx)
            .await?;

        let next_position: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM dialogues WHERE chapter_id = $1",
        )
        .bind(chapter_id)
        .fetch_one(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO dialogues (chapter_id, character_id, kind, content, position)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let dialogue = sqlx::query_as::<_, Dialogue>(&query)
            .bind(chapter_id)
            .bind(input.character_id)
            .bind(input.kind.as_deref().unwrap_or(DIALOGUE_SPEECH))
            .bind(&input.content)
            .bind(next_position)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(dialogue)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Dialogue>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dialogues WHERE id = $1");
        sqlx::query_as::<_, Dialogue>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a chapter's lines in order with speaker names resolved.
    pub async fn list_by_chapter(
        pool: &PgPool,
        chapter_id: DbId,
    ) -> Result<Vec<DialogueWithCharacter>, sqlx::Error> {
        let query = format!(
            "SELECT {WITH_CHARACTER_COLUMNS}
             FROM dialogues d
             LEFT JOIN characters c ON c.id = d.character_id
             WHERE d.chapter_id = $1
             ORDER BY d.position, d.id"
        );
        sqlx::query_as::<_, DialogueWithCharacter>(&query)
            .bind(chapter_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDialogue,
    ) -> Result<Option<Dialogue>, sqlx::Error> {
        let query = format!(
            "UPDATE dialogues SET
                character_id = COALESCE($2, character_id),
                kind = COALESCE($3, kind),
                content = COALESCE($4, content),
                position = COALESCE($5, position)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dialogue>(&query)
            .bind(id)
            .bind(input.character_id)
            .bind(&input.kind)
            .bind(&input.content)
            .bind(input.position)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dialogues WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
