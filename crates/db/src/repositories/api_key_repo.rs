//! Repository for the `api_keys` table.

use chatstory_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::api_key::{ApiKey, ApiKeyOwner};

const COLUMNS: &str = "id, user_id, name, key_prefix, key_hash, expires_at, last_used_at, \
                       usage_count, is_active, created_at";

/// Provides operations for per-user API keys.
pub struct ApiKeyRepo;

impl ApiKeyRepo {
    /// Create a new API key. Returns the full row (with hash).
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        name: &str,
        key_prefix: &str,
        key_hash: &str,
        expires_at: Option<Timestamp>,
    ) -> Result<ApiKey, sqlx::Error> {
        let query = format!(
            "INSERT INTO api_keys (user_id, name, key_prefix, key_hash, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(user_id)
            .bind(name)
            .bind(key_prefix)
            .bind(key_hash)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// List a user's keys, newest first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<ApiKey>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Count keys that are active and not yet expired.
    pub async fn count_active(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM api_keys \
             WHERE user_id = $1 AND is_active = true \
               AND (expires_at IS NULL OR expires_at > NOW())",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Delete one of the user's keys. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Resolve a key hash to its owner.
    ///
    /// Only active, unexpired keys belonging to an active user match.
    pub async fn find_owner_by_hash(
        pool: &PgPool,
        key_hash: &str,
    ) -> Result<Option<ApiKeyOwner>, sqlx::Error> {
        sqlx::query_as::<_, ApiKeyOwner>(
            "SELECT k.id AS key_id, u.id AS user_id, u.role \
             FROM api_keys k \
             JOIN users u ON u.id = k.user_id \
             WHERE k.key_hash = $1 \
               AND k.is_active = true \
               AND (k.expires_at IS NULL OR k.expires_at > NOW()) \
               AND u.is_active = true",
        )
        .bind(key_hash)
        .fetch_optional(pool)
        .await
    }

    /// Record a use of the key.
    pub async fn touch_usage(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE api_keys SET last_used_at = NOW(), usage_count = usage_count + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
