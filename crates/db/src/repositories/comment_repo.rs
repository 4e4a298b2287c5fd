//! Repository for the `comments` table.

use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::comment::{Comment, CommentWithAuthor};

const COLUMNS: &str = "id, story_id, user_id, content, created_at";

pub struct CommentRepo;

impl CommentRepo {
    pub async fn create(
        pool: &PgPool,
        story_id: DbId,
        user_id: DbId,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "INSERT INTO comments (story_id, user_id, content)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(story_id)
            .bind(user_id)
            .bind(content)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM comments WHERE id = $1");
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a story's comments with author details, newest first.
    pub async fn list_by_story(
        pool: &PgPool,
        story_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, CommentWithAuthor>(
            "SELECT c.id, c.story_id, c.user_id, u.username, u.avatar_url, u.has_badge,
                    c.content, c.created_at
             FROM comments c
             JOIN users u ON u.id = c.user_id
             WHERE c.story_id = $1
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(story_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
