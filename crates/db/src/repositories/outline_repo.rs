//! Repository for the `outlines` table.

use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::outline::{CreateOutline, Outline, UpdateOutline};

const COLUMNS: &str = "id, story_id, title, content, position, created_at, updated_at";

pub struct OutlineRepo;

impl OutlineRepo {
    /// Append an outline entry at the end of the story's list.
    pub async fn create(
        pool: &PgPool,
        story_id: DbId,
        input: &CreateOutline,
    ) -> Result<Outline, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM stories WHERE id = $1 FOR UPDATE")
            .bind(story_id)
            .execute(&mut *tx)
            .await?;

        let next_position: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM outlines WHERE story_id = $1",
        )
        .bind(story_id)
        .fetch_one(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO outlines (story_id, title, content, position)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let outline = sqlx::query_as::<_, Outline>(&query)
            .bind(story_id)
            .bind(&input.title)
            .bind(&input.content)
            .bind(next_position)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(outline)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Outline>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM outlines WHERE id = $1");
        sqlx::query_as::<_, Outline>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_story(pool: &PgPool, story_id: DbId) -> Result<Vec<Outline>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM outlines WHERE story_id = $1 ORDER BY position, id");
        sqlx::query_as::<_, Outline>(&query)
            .bind(story_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateOutline,
    ) -> Result<Option<Outline>, sqlx::Error> {
        let query = format!(
            "UPDATE outlines SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                position = COALESCE($4, position)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Outline>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.content)
            .bind(input.position)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM outlines WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
