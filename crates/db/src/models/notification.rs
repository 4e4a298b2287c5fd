//! Notification entity model and DTOs.

use chatstory_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub story_id: Option<DbId>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Insert DTO used by the notification router.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub story_id: Option<DbId>,
}

/// Recipient details needed to deliver a notification.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRecipient {
    pub user_id: DbId,
    pub email: String,
    pub email_notifications: bool,
}
