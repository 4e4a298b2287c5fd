//! Repository for the `characters` table.

use chatstory_core::story::CHARACTER_SUPPORTING;
use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::character::{Character, CreateCharacter, UpdateCharacter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, story_id, name, role, description, gender, personality, appearance, \
                       background, avatar_url, created_at, updated_at";

/// Provides CRUD operations for story characters.
pub struct CharacterRepo;

impl CharacterRepo {
    /// Insert a character into a story. `role` defaults to `supporting`.
    pub async fn create(
        pool: &PgPool,
        story_id: DbId,
        input: &CreateCharacter,
    ) -> Result<Character, sqlx::Error> {
        let query = format!(
            "INSERT INTO characters
                (story_id, name, role, description, gender, personality, appearance, background, avatar_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(story_id)
            .bind(&input.name)
            .bind(input.role.as_deref().unwrap_or(CHARACTER_SUPPORTING))
            .bind(&input.description)
            .bind(&input.gender)
            .bind(&input.personality)
            .bind(&input.appearance)
            .bind(&input.background)
            .bind(&input.avatar_url)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Character>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM characters WHERE id = $1");
        sqlx::query_as::<_, Character>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a character of a story by name, ignoring case.
    pub async fn find_by_name(
        pool: &PgPool,
        story_id: DbId,
        name: &str,
    ) -> Result<Option<Character>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM characters
             WHERE story_id = $1 AND LOWER(name) = LOWER($2)
             ORDER BY id LIMIT 1"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(story_id)
            .bind(name.trim())
            .fetch_optional(pool)
            .await
    }

    /// List characters of a story, main characters first.
    pub async fn list_by_story(
        pool: &PgPool,
        story_id: DbId,
    ) -> Result<Vec<Character>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM characters
             WHERE story_id = $1
             ORDER BY (role = 'main') DESC, id"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(story_id)
            .fetch_all(pool)
            .await
    }

    /// Update a character. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCharacter,
    ) -> Result<Option<Character>, sqlx::Error> {
        let query = format!(
            "UPDATE characters SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                description = COALESCE($4, description),
                gender = COALESCE($5, gender),
                personality = COALESCE($6, personality),
                appearance = COALESCE($7, appearance),
                background = COALESCE($8, background),
                avatar_url = COALESCE($9, avatar_url)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.role)
            .bind(&input.description)
            .bind(&input.gender)
            .bind(&input.personality)
            .bind(&input.appearance)
            .bind(&input.background)
            .bind(&input.avatar_url)
            .fetch_optional(pool)
            .await
    }

    /// Delete a character. Its dialogue lines remain, unattributed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE dialogues SET character_id = NULL WHERE character_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM characters WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
