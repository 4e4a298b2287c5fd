//! Repository for the `chapters` table.

use chatstory_core::story::{CHAPTER_PUBLISHED, STORY_PUBLISHED};
use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::chapter::{Chapter, CreateChapter, UpdateChapter};

const COLUMNS: &str = "id, story_id, title, summary, status, chapter_order, publish_order, \
                       published_at, created_at, updated_at";

/// Provides CRUD and publishing for chapters.
pub struct ChapterRepo;

impl ChapterRepo {
    /// Append a chapter to a story.
    ///
    /// The story row is locked so concurrent creates get distinct
    /// `chapter_order` values.
    pub async fn create(
        pool: &PgPool,
        story_id: DbId,
        input: &CreateChapter,
    ) -> Result<Chapter, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM stories WHERE id = $1 FOR UPDATE")
            .bind(story_id)
            .execute(&mut *tx)
            .await?;

        let next_order: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(chapter_order), 0) + 1 FROM chapters WHERE story_id = $1",
        )
        .bind(story_id)
        .fetch_one(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO chapters (story_id, title, summary, chapter_order)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let chapter = sqlx::query_as::<_, Chapter>(&query)
            .bind(story_id)
            .bind(&input.title)
            .bind(&input.summary)
            .bind(next_order)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(chapter)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Chapter>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM chapters WHERE id = $1");
        sqlx::query_as::<_, Chapter>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every chapter of a story in reading order.
    pub async fn list_by_story(pool: &PgPool, story_id: DbId) -> Result<Vec<Chapter>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chapters WHERE story_id = $1 ORDER BY chapter_order, id"
        );
        sqlx::query_as::<_, Chapter>(&query)
            .bind(story_id)
            .fetch_all(pool)
            .await
    }

    /// List only the published chapters of a story in reading order.
    pub async fn list_published_by_story(
        pool: &PgPool,
        story_id: DbId,
    ) -> Result<Vec<Chapter>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chapters
             WHERE story_id = $1 AND status = $2
             ORDER BY chapter_order, id"
        );
        sqlx::query_as::<_, Chapter>(&query)
            .bind(story_id)
            .bind(CHAPTER_PUBLISHED)
            .fetch_all(pool)
            .await
    }

    /// Find a chapter readers may see: published, in a published story.
    pub async fn find_readable(
        pool: &PgPool,
        story_id: DbId,
        chapter_id: DbId,
    ) -> Result<Option<Chapter>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chapters
             WHERE id = $1 AND story_id = $2 AND status = $3
               AND EXISTS (SELECT 1 FROM stories s WHERE s.id = $2 AND s.status = $4)"
        );
        sqlx::query_as::<_, Chapter>(&query)
            .bind(chapter_id)
            .bind(story_id)
            .bind(CHAPTER_PUBLISHED)
            .bind(STORY_PUBLISHED)
            .fetch_optional(pool)
            .await
    }

    /// Update a chapter. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateChapter,
    ) -> Result<Option<Chapter>, sqlx::Error> {
        let query = format!(
            "UPDATE chapters SET
                title = COALESCE($2, title),
                summary = COALESCE($3, summary),
                chapter_order = COALESCE($4, chapter_order)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Chapter>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.summary)
            .bind(input.chapter_order)
            .fetch_optional(pool)
            .await
    }

    /// Publish a chapter with the next per-story `publish_order`.
    ///
    /// Returns `None` if the chapter does not exist or is already published.
    pub async fn publish(
        pool: &PgPool,
        story_id: DbId,
        id: DbId,
    ) -> Result<Option<Chapter>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM stories WHERE id = $1 FOR UPDATE")
            .bind(story_id)
            .execute(&mut *tx)
            .await?;

        let next_order: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(publish_order), 0) + 1 FROM chapters WHERE story_id = $1",
        )
        .bind(story_id)
        .fetch_one(&mut *tx)
        .await?;

        let query = format!(
            "UPDATE chapters SET
                status = $3,
                publish_order = $4,
                published_at = NOW()
             WHERE id = $1 AND story_id = $2 AND status <> $3
             RETURNING {COLUMNS}"
        );
        let chapter = sqlx::query_as::<_, Chapter>(&query)
            .bind(id)
            .bind(story_id)
            .bind(CHAPTER_PUBLISHED)
            .bind(next_order)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(chapter)
    }

    /// Delete a chapter together with its dialogues.
    ///
    /// Bookmarks pointing at the chapter fall back to the story level.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM dialogues WHERE chapter_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE bookmarks SET chapter_id = NULL WHERE chapter_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM chapters WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
