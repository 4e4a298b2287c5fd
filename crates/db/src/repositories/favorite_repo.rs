//! Repository for the `favorites` join table.

use chatstory_core::types::DbId;
use sqlx::PgPool;

use crate::models::favorite::FavoriteStory;

/// Provides toggle and listing of favourited stories.
pub struct FavoriteRepo;

impl FavoriteRepo {
    /// Flip the favourite state of a story for a user.
    ///
    /// Returns `true` if the story is now favourited.
    pub async fn toggle(pool: &PgPool, user_id: DbId, story_id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let removed = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND story_id = $2")
            .bind(user_id)
            .bind(story_id)
            .execute(&mut *tx)
            .await?;

        let favorited = if removed.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO favorites (user_id, story_id) VALUES ($1, $2)
                 ON CONFLICT (user_id, story_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(story_id)
            .execute(&mut *tx)
            .await?;
            true
        } else {
            false
        };

        tx.commit().await?;
        Ok(favorited)
    }

    pub async fn is_favorited(
        pool: &PgPool,
        user_id: DbId,
        story_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND story_id = $2)",
        )
        .bind(user_id)
        .bind(story_id)
        .fetch_one(pool)
        .await
    }

    /// List a user's favourited stories that are still published.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<FavoriteStory>, sqlx::Error> {
        sqlx::query_as::<_, FavoriteStory>(
            "SELECT s.id AS story_id, s.title, s.cover_url, u.username AS author_username,
                    f.created_at AS favorited_at
             FROM favorites f
             JOIN stories s ON s.id = f.story_id
             JOIN users u ON u.id = s.user_id
             WHERE f.user_id = $1 AND s.status = 'published'
             ORDER BY f.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
