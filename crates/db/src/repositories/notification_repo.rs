//! Repository for the `notifications` table.

use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::{CreateNotification, Notification, NotificationRecipient};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, user_id, kind, title, message, story_id, is_read, read_at, created_at";

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Create a notification, returning the stored row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (user_id, kind, title, message, story_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.user_id)
            .bind(&input.kind)
            .bind(&input.title)
            .bind(&input.message)
            .bind(input.story_id)
            .fetch_one(pool)
            .await
    }

    /// List notifications for a user.
    ///
    /// When `unread_only` is `true`, only notifications with `is_read = false`
    /// are returned.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let filter = if unread_only {
            "AND is_read = false"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 {filter} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark a single notification as read. Already-read rows keep their `read_at`.
    ///
    /// Returns `true` if the notification exists for the given user.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = COALESCE(read_at, NOW()) \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark all unread notifications as read for a user.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW() \
             WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Get the number of unread notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Recipient resolution
    // -----------------------------------------------------------------------

    /// Delivery details for a single active user.
    pub async fn find_recipient(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<NotificationRecipient>, sqlx::Error> {
        sqlx::query_as::<_, NotificationRecipient>(
            "SELECT id AS user_id, email, email_notifications \
             FROM users WHERE id = $1 AND is_active = true",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Readers following a story (favourited or bookmarked it), excluding `except_user`.
    pub async fn story_followers(
        pool: &PgPool,
        story_id: DbId,
        except_user: DbId,
    ) -> Result<Vec<NotificationRecipient>, sqlx::Error> {
        sqlx::query_as::<_, NotificationRecipient>(
            "SELECT u.id AS user_id, u.email, u.email_notifications \
             FROM users u \
             WHERE u.is_active = true AND u.id <> $2 \
               AND (EXISTS (SELECT 1 FROM favorites f WHERE f.user_id = u.id AND f.story_id = $1) \
                 OR EXISTS (SELECT 1 FROM bookmarks b WHERE b.user_id = u.id AND b.story_id = $1))",
        )
        .bind(story_id)
        .bind(except_user)
        .fetch_all(pool)
        .await
    }
}
