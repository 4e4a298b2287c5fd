//! Repository for the `bookmarks` table.

use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::bookmark::{Bookmark, BookmarkDetail};

const COLUMNS: &str = "user_id, story_id, chapter_id, created_at, updated_at";

/// Provides reading-position bookmarks, one per user and story.
pub struct BookmarkRepo;

impl BookmarkRepo {
    /// Create or move the user's bookmark for a story.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        story_id: DbId,
        chapter_id: Option<DbId>,
    ) -> Result<Bookmark, sqlx::Error> {
        let query = format!(
            "INSERT INTO bookmarks (user_id, story_id, chapter_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, story_id) DO UPDATE SET chapter_id = EXCLUDED.chapter_id
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Bookmark>(&query)
            .bind(user_id)
            .bind(story_id)
            .bind(chapter_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find(
        pool: &PgPool,
        user_id: DbId,
        story_id: DbId,
    ) -> Result<Option<Bookmark>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM bookmarks WHERE user_id = $1 AND story_id = $2");
        sqlx::query_as::<_, Bookmark>(&query)
            .bind(user_id)
            .bind(story_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, user_id: DbId, story_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND story_id = $2")
            .bind(user_id)
            .bind(story_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a user's bookmarks, most recently moved first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<BookmarkDetail>, sqlx::Error> {
        sqlx::query_as::<_, BookmarkDetail>(
            "SELECT b.story_id, s.title AS story_title, s.cover_url,
                    b.chapter_id, c.title AS chapter_title, b.updated_at
             FROM bookmarks b
             JOIN stories s ON s.id = b.story_id
             LEFT JOIN chapters c ON c.id = b.chapter_id
             WHERE b.user_id = $1
             ORDER BY b.updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
