//! User entity model and DTOs.

use chatstory_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string. Never serialised.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing)]
    pub avatar_file_id: Option<String>,
    pub has_badge: bool,
    pub badge_granted_at: Option<Timestamp>,
    pub email_notifications: bool,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert DTO. The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfile {
    pub username: Option<String>,
    pub email_notifications: Option<bool>,
}

/// Minimal public author info embedded in reader-facing payloads.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuthorInfo {
    pub id: DbId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub has_badge: bool,
}
