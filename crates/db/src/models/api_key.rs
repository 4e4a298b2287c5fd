//! API key entity model and DTOs.

use chatstory_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `api_keys` table. The hash is never serialised.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApiKey {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub key_prefix: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub expires_at: Option<Timestamp>,
    pub last_used_at: Option<Timestamp>,
    pub usage_count: i64,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// The owner resolved from a presented API key.
#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyOwner {
    pub key_id: DbId,
    pub user_id: DbId,
    pub role: String,
}

/// Request body for creating an API key.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateApiKey {
    pub name: String,
    pub expires_in_days: Option<i64>,
}

/// Response returned once on creation, carrying the plaintext key.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyCreatedResponse {
    pub id: DbId,
    pub name: String,
    pub key_prefix: String,
    pub plaintext_key: String,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
