use std::sync::Arc;

use chatstory_cloud::{AiClient, StorageProvider};
use chatstory_events::{EmailDelivery, EventBus};

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
/// Integrations are optional; handlers that need a missing one answer 503.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: chatstory_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Event bus for story activity (comments, favourites, publications).
    pub event_bus: Arc<EventBus>,
    /// File storage for covers and avatars.
    pub storage: Option<Arc<dyn StorageProvider>>,
    /// Generative text/image client.
    pub ai: Option<Arc<AiClient>>,
    /// SMTP delivery for password resets.
    pub email: Option<Arc<EmailDelivery>>,
}

impl AppState {
    /// The storage provider, or 503 if none is configured.
    pub fn storage(&self) -> AppResult<&Arc<dyn StorageProvider>> {
        self.storage
            .as_ref()
            .ok_or_else(|| AppError::ServiceUnavailable("File storage is not configured".into()))
    }

    /// The AI client, or 503 if none is configured.
    pub fn ai(&self) -> AppResult<&Arc<AiClient>> {
        self.ai
            .as_ref()
            .ok_or_else(|| AppError::ServiceUnavailable("AI assistant is not configured".into()))
    }
}
