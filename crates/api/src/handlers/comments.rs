//! Handlers for reader comments on published stories.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chatstory_core::error::CoreError;
use chatstory_core::story::validate_comment;
use chatstory_core::types::DbId;
use chatstory_db::models::comment::{Comment, CommentWithAuthor, CreateComment};
use chatstory_db::repositories::{CommentRepo, StoryRepo};
use chatstory_events::bus::STORY_COMMENTED;
use chatstory_events::StoryEvent;

use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Characters of the comment quoted in the owner's notification.
const EXCERPT_CHARS: usize = 120;

/// GET /api/v1/library/stories/{id}/comments
pub async fn list(
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<CommentWithAuthor>>>> {
    StoryRepo::find_published(&state.pool, story_id)
        .await?
        .ok_or_else(|| not_found("Story", story_id))?;

    let (limit, offset) = params.resolve();
    let comments = CommentRepo::list_by_story(&state.pool, story_id, limit, offset).await?;
    Ok(Json(DataResponse { data: comments }))
}

/// POST /api/v1/library/stories/{id}/comments
pub async fn create(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
    Json(input): Json<CreateComment>,
) -> AppResult<(StatusCode, Json<DataResponse<Comment>>)> {
    validate_comment(&input.content)?;
    let story = StoryRepo::find_published(&state.pool, story_id)
        .await?
        .ok_or_else(|| not_found("Story", story_id))?;

    let content = input.content.trim();
    let comment = CommentRepo::create(&state.pool, story_id, auth_user.user_id, content).await?;

    tracing::info!(comment_id = comment.id, story_id, user_id = auth_user.user_id, "Comment posted");
    state.event_bus.publish(
        StoryEvent::new(STORY_COMMENTED)
            .with_story(story_id)
            .with_actor(auth_user.user_id)
            .with_payload(serde_json::json!({
                "story_title": story.title,
                "owner_id": story.author_id,
                "excerpt": excerpt(content),
            })),
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: comment })))
}

/// DELETE /api/v1/comments/{id}
///
/// Allowed for the comment's author, the story's owner and admins.
pub async fn delete(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let comment = CommentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Comment", id))?;

    let allowed = comment.user_id == auth_user.user_id
        || auth_user.is_admin()
        || StoryRepo::find_by_id(&state.pool, comment.story_id)
            .await?
            .is_some_and(|s| s.user_id == auth_user.user_id);
    if !allowed {
        return Err(AppError::Core(CoreError::Forbidden(
            "You cannot delete this comment".into(),
        )));
    }

    if !CommentRepo::delete(&state.pool, id).await? {
        return Err(not_found("Comment", id));
    }
    tracing::info!(comment_id = id, user_id = auth_user.user_id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// First [`EXCERPT_CHARS`] characters, with an ellipsis when cut.
fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
