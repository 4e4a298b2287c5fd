//! Repository for the `stories` table, including the public library views.

use chatstory_core::story::{STORY_ARCHIVED, STORY_PUBLISHED};
use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::story::{CreateStory, LibraryFilter, LibrarySort, LibraryStory, Story, UpdateStory};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, title, description, genre, cover_url, cover_file_id, status, \
                       publish_order, view_count, published_at, created_at, updated_at";

/// Columns for library listings. Expects `stories s JOIN users u`.
const LIBRARY_COLUMNS: &str = "\
    s.id, s.title, s.description, s.genre, s.cover_url, s.view_count, s.published_at, \
    u.id AS author_id, u.username AS author_username, u.has_badge AS author_has_badge, \
    (SELECT COUNT(*) FROM favorites f WHERE f.story_id = s.id) AS favorite_count, \
    (SELECT COUNT(*) FROM chapters c WHERE c.story_id = s.id AND c.status = 'published') AS chapter_count";

/// Advisory lock key serialising the global `publish_order` counter.
const PUBLISH_ORDER_LOCK: i64 = 0x5354_4f52;

/// Provides CRUD, publishing and library queries for stories.
pub struct StoryRepo;

impl StoryRepo {
    /// Insert a new draft story, returning the created row.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateStory,
    ) -> Result<Story, sqlx::Error> {
        let query = format!(
            "INSERT INTO stories (user_id, title, description, genre)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(user_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.genre)
            .fetch_one(pool)
            .await
    }

    /// Find a story by ID regardless of status.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Story>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stories WHERE id = $1");
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List an author's stories, most recently updated first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        status: Option<&str>,
    ) -> Result<Vec<Story>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stories
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY updated_at DESC"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(user_id)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    /// Update a story. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateStory,
    ) -> Result<Option<Story>, sqlx::Error> {
        let query = format!(
            "UPDATE stories SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                genre = COALESCE($4, genre)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.genre)
            .fetch_optional(pool)
            .await
    }

    /// Replace the cover image, returning the updated row.
    pub async fn set_cover(
        pool: &PgPool,
        id: DbId,
        cover_url: &str,
        cover_file_id: &str,
    ) -> Result<Option<Story>, sqlx::Error> {
        let query = format!(
            "UPDATE stories SET cover_url = $2, cover_file_id = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(cover_url)
            .bind(cover_file_id)
            .fetch_optional(pool)
            .await
    }

    /// Publish a story.
    ///
    /// The first publication takes the next global `publish_order`; a story
    /// re-published after being archived keeps its original order. Returns
    /// `None` if the story does not exist or is already published.
    pub async fn publish(pool: &PgPool, id: DbId) -> Result<Option<Story>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(PUBLISH_ORDER_LOCK)
            .execute(&mut *tx)
            .await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM stories WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        match status.as_deref() {
            None | Some(STORY_PUBLISHED) => return Ok(None),
            Some(_) => {}
        }

        let next_order: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(publish_order), 0) + 1 FROM stories")
                .fetch_one(&mut *tx)
                .await?;

        let query = format!(
            "UPDATE stories SET
                status = $2,
                publish_order = COALESCE(publish_order, $3),
                published_at = COALESCE(published_at, NOW())
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let story = sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(STORY_PUBLISHED)
            .bind(next_order)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(story))
    }

    /// Withdraw a published story from the library (status `archived`).
    ///
    /// Returns `None` if the story is not currently published.
    pub async fn unpublish(pool: &PgPool, id: DbId) -> Result<Option<Story>, sqlx::Error> {
        let query = format!(
            "UPDATE stories SET status = $2
             WHERE id = $1 AND status = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(STORY_ARCHIVED)
            .bind(STORY_PUBLISHED)
            .fetch_optional(pool)
            .await
    }

    /// Delete a story and everything hanging off it in one transaction.
    ///
    /// Chat sessions survive with their story reference cleared. Returns
    /// `true` if the story existed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let statements = [
            "DELETE FROM dialogues WHERE chapter_id IN (SELECT id FROM chapters WHERE story_id = $1)",
            "DELETE FROM bookmarks WHERE story_id = $1",
            "DELETE FROM chapters WHERE story_id = $1",
            "DELETE FROM outlines WHERE story_id = $1",
            "DELETE FROM characters WHERE story_id = $1",
            "DELETE FROM comments WHERE story_id = $1",
            "DELETE FROM favorites WHERE story_id = $1",
            "DELETE FROM notifications WHERE story_id = $1",
            "UPDATE chat_sessions SET story_id = NULL WHERE story_id = $1",
        ];
        for statement in statements {
            sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        }

        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Library
    // -----------------------------------------------------------------------

    /// List published stories matching `filter`.
    pub async fn list_library(
        pool: &PgPool,
        filter: &LibraryFilter,
    ) -> Result<Vec<LibraryStory>, sqlx::Error> {
        let order = match filter.sort {
            LibrarySort::Latest => "s.publish_order DESC",
            LibrarySort::Popular => "s.view_count DESC, s.publish_order DESC",
        };
        let query = format!(
            "SELECT {LIBRARY_COLUMNS}
             FROM stories s
             JOIN users u ON u.id = s.user_id
             WHERE s.status = $1
               AND ($2::TEXT IS NULL OR s.title ILIKE '%' || $2 || '%')
               AND ($3::TEXT IS NULL OR s.genre = $3)
             ORDER BY {order}
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, LibraryStory>(&query)
            .bind(STORY_PUBLISHED)
            .bind(&filter.search)
            .bind(&filter.genre)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// Find a published story for the library detail page.
    pub async fn find_published(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<LibraryStory>, sqlx::Error> {
        let query = format!(
            "SELECT {LIBRARY_COLUMNS}
             FROM stories s
             JOIN users u ON u.id = s.user_id
             WHERE s.id = $1 AND s.status = $2"
        );
        sqlx::query_as::<_, LibraryStory>(&query)
            .bind(id)
            .bind(STORY_PUBLISHED)
            .fetch_optional(pool)
            .await
    }

    /// Bump the view counter of a published story.
    pub async fn increment_views(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE stories SET view_count = view_count + 1 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(STORY_PUBLISHED)
            .execute(pool)
            .await?;
        Ok(())
    }
}
