//! Handlers for reading-position bookmarks.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chatstory_core::types::DbId;
use chatstory_db::models::bookmark::{Bookmark, BookmarkDetail, UpsertBookmark};
use chatstory_db::repositories::{BookmarkRepo, ChapterRepo, StoryRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// PUT /api/v1/library/stories/{id}/bookmark
///
/// Create or move the caller's bookmark. The chapter, when given, must be a
/// readable chapter of this story.
pub async fn upsert(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
    Json(input): Json<UpsertBookmark>,
) -> AppResult<Json<DataResponse<Bookmark>>> {
    StoryRepo::find_published(&state.pool, story_id)
        .await?
        .ok_or_else(|| not_found("Story", story_id))?;

    if let Some(chapter_id) = input.chapter_id {
        if ChapterRepo::find_readable(&state.pool, story_id, chapter_id)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest(format!(
                "Chapter {chapter_id} is not a published chapter of this story"
            )));
        }
    }

    let bookmark =
        BookmarkRepo::upsert(&state.pool, auth_user.user_id, story_id, input.chapter_id).await?;
    Ok(Json(DataResponse { data: bookmark }))
}

/// DELETE /api/v1/library/stories/{id}/bookmark
pub async fn delete(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !BookmarkRepo::delete(&state.pool, auth_user.user_id, story_id).await? {
        return Err(not_found("Bookmark", story_id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/bookmarks
pub async fn list_mine(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<BookmarkDetail>>>> {
    let bookmarks = BookmarkRepo::list_by_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse { data: bookmarks }))
}
