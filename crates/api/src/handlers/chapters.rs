//! Handlers for chapters of an owned story.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chatstory_core::error::CoreError;
use chatstory_core::story::{
    ensure_chapter_publishable, validate_max_len, validate_title, MAX_DESCRIPTION_LEN,
    STORY_PUBLISHED,
};
use chatstory_core::types::DbId;
use chatstory_db::models::chapter::{Chapter, CreateChapter, UpdateChapter};
use chatstory_db::repositories::ChapterRepo;
use chatstory_events::bus::CHAPTER_PUBLISHED;
use chatstory_events::StoryEvent;

use crate::error::{AppError, AppResult};
use crate::handlers::{not_found, owned_chapter, owned_story};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

fn validate_summary(summary: Option<&str>) -> Result<(), CoreError> {
    match summary {
        Some(s) => validate_max_len("summary", s, MAX_DESCRIPTION_LEN),
        None => Ok(()),
    }
}

/// Validate and append a chapter to a story the caller owns.
pub(crate) async fn create_chapter(
    state: &AppState,
    user_id: DbId,
    story_id: DbId,
    input: &CreateChapter,
) -> AppResult<Chapter> {
    validate_title(&input.title)?;
    validate_summary(input.summary.as_deref())?;
    owned_story(state, user_id, story_id).await?;

    let chapter = ChapterRepo::create(&state.pool, story_id, input).await?;
    tracing::info!(
        chapter_id = chapter.id,
        story_id,
        chapter_order = chapter.chapter_order,
        "Chapter created"
    );
    Ok(chapter)
}

/// POST /api/v1/stories/{id}/chapters
pub async fn create(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
    Json(input): Json<CreateChapter>,
) -> AppResult<(StatusCode, Json<DataResponse<Chapter>>)> {
    let chapter = create_chapter(&state, auth_user.user_id, story_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: chapter })))
}

/// GET /api/v1/stories/{id}/chapters
pub async fn list_by_story(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Chapter>>>> {
    owned_story(&state, auth_user.user_id, story_id).await?;
    let chapters = ChapterRepo::list_by_story(&state.pool, story_id).await?;
    Ok(Json(DataResponse { data: chapters }))
}

/// GET /api/v1/chapters/{id}
pub async fn get_by_id(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Chapter>>> {
    let (_, chapter) = owned_chapter(&state, auth_user.user_id, id).await?;
    Ok(Json(DataResponse { data: chapter }))
}

/// PUT /api/v1/chapters/{id}
pub async fn update(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateChapter>,
) -> AppResult<Json<DataResponse<Chapter>>> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    validate_summary(input.summary.as_deref())?;
    if input.chapter_order.is_some_and(|order| order < 1) {
        return Err(AppError::Core(CoreError::Validation(
            "chapter_order must be at least 1".into(),
        )));
    }

    owned_chapter(&state, auth_user.user_id, id).await?;
    let chapter = ChapterRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("Chapter", id))?;
    Ok(Json(DataResponse { data: chapter }))
}

/// DELETE /api/v1/chapters/{id}
pub async fn delete(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    owned_chapter(&state, auth_user.user_id, id).await?;
    if !ChapterRepo::delete(&state.pool, id).await? {
        return Err(not_found("Chapter", id));
    }
    tracing::info!(chapter_id = id, "Chapter deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/chapters/{id}/publish
///
/// Chapters publish independently of their story. Followers are notified
/// only when the story itself is already public.
pub async fn publish(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Chapter>>> {
    let (story, chapter) = owned_chapter(&state, auth_user.user_id, id).await?;
    ensure_chapter_publishable(&chapter.status)?;

    let chapter = ChapterRepo::publish(&state.pool, story.id, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict("Chapter is already published".into()))
        })?;

    tracing::info!(
        chapter_id = id,
        story_id = story.id,
        publish_order = ?chapter.publish_order,
        "Chapter published"
    );

    if story.status == STORY_PUBLISHED {
        state.event_bus.publish(
            StoryEvent::new(CHAPTER_PUBLISHED)
                .with_story(story.id)
                .with_actor(auth_user.user_id)
                .with_payload(serde_json::json!({
                    "story_title": story.title,
                    "chapter_id": chapter.id,
                    "chapter_title": chapter.title,
                })),
        );
    }

    Ok(Json(DataResponse { data: chapter }))
}
