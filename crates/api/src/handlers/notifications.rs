//! Handlers for the caller's in-app notifications.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chatstory_core::types::DbId;
use chatstory_db::models::notification::Notification;
use chatstory_db::repositories::NotificationRepo;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::not_found;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsParams {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// GET /api/v1/notifications
pub async fn list(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListNotificationsParams>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let notifications = NotificationRepo::list_for_user(
        &state.pool,
        auth_user.user_id,
        params.unread_only,
        limit,
        offset,
    )
    .await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let count = NotificationRepo::unread_count(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse {
        data: UnreadCount { count },
    }))
}

/// POST /api/v1/notifications/{id}/read
pub async fn mark_read(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !NotificationRepo::mark_read(&state.pool, id, auth_user.user_id).await? {
        return Err(not_found("Notification", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MarkedRead>>> {
    let updated = NotificationRepo::mark_all_read(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse {
        data: MarkedRead { updated },
    }))
}

/// DELETE /api/v1/notifications/{id}
pub async fn delete(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !NotificationRepo::delete(&state.pool, id, auth_user.user_id).await? {
        return Err(not_found("Notification", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
