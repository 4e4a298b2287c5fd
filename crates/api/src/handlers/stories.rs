//! Handlers for the author-facing `/stories` resource.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chatstory_cloud::StoredFile;
use chatstory_core::error::CoreError;
use chatstory_core::prompts::cover_image_prompt;
use chatstory_core::story::{
    ensure_story_publishable, ensure_story_unpublishable, validate_description, validate_genre,
    validate_story_status, validate_title,
};
use chatstory_core::types::DbId;
use chatstory_db::models::story::{CreateStory, Story, UpdateStory};
use chatstory_db::repositories::StoryRepo;
use chatstory_events::bus::STORY_PUBLISHED;
use chatstory_events::StoryEvent;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::uploads::{discard_file, discard_on_error, read_image, store};
use crate::handlers::{not_found, owned_story};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /stories`.
#[derive(Debug, Default, Deserialize)]
pub struct ListStoriesParams {
    pub status: Option<String>,
}

/// Request body for `POST /stories/{id}/cover/generate`.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateCoverRequest {
    /// Custom image prompt. Built from the story when omitted.
    pub prompt: Option<String>,
}

// ---------------------------------------------------------------------------
// Shared mutations (also used by the chat command executor)
// ---------------------------------------------------------------------------

/// Validate and insert a new draft story owned by `user_id`.
pub(crate) async fn create_story(
    state: &AppState,
    user_id: DbId,
    input: &CreateStory,
) -> AppResult<Story> {
    validate_title(&input.title)?;
    validate_description(input.description.as_deref())?;
    if let Some(genre) = &input.genre {
        validate_genre(genre)?;
    }

    let story = StoryRepo::create(&state.pool, user_id, input).await?;
    tracing::info!(story_id = story.id, user_id, "Story created");
    Ok(story)
}

/// Validate and apply an update to a story the caller owns.
pub(crate) async fn update_owned_story(
    state: &AppState,
    user_id: DbId,
    story_id: DbId,
    input: &UpdateStory,
) -> AppResult<Story> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    validate_description(input.description.as_deref())?;
    if let Some(genre) = &input.genre {
        validate_genre(genre)?;
    }

    owned_story(state, user_id, story_id).await?;
    StoryRepo::update(&state.pool, story_id, input)
        .await?
        .ok_or_else(|| not_found("Story", story_id))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/stories
pub async fn create(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateStory>,
) -> AppResult<(StatusCode, Json<DataResponse<Story>>)> {
    let story = create_story(&state, auth_user.user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: story })))
}

/// GET /api/v1/stories
///
/// The caller's stories, optionally filtered by `status`.
pub async fn list(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListStoriesParams>,
) -> AppResult<Json<DataResponse<Vec<Story>>>> {
    if let Some(status) = &params.status {
        validate_story_status(status)?;
    }
    let stories =
        StoryRepo::list_by_user(&state.pool, auth_user.user_id, params.status.as_deref()).await?;
    Ok(Json(DataResponse { data: stories }))
}

/// GET /api/v1/stories/{id}
pub async fn get_by_id(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Story>>> {
    let story = owned_story(&state, auth_user.user_id, id).await?;
    Ok(Json(DataResponse { data: story }))
}

/// PUT /api/v1/stories/{id}
pub async fn update(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStory>,
) -> AppResult<Json<DataResponse<Story>>> {
    let story = update_owned_story(&state, auth_user.user_id, id, &input).await?;
    Ok(Json(DataResponse { data: story }))
}

/// DELETE /api/v1/stories/{id}
///
/// Removes the story with all of its content. The cover file is deleted
/// from storage after the database commit.
pub async fn delete(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let story = owned_story(&state, auth_user.user_id, id).await?;
    if !StoryRepo::delete(&state.pool, id).await? {
        return Err(not_found("Story", id));
    }

    tracing::info!(story_id = id, user_id = auth_user.user_id, "Story deleted");
    discard_file(&state, story.cover_file_id, "story", id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/stories/{id}/publish
pub async fn publish(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Story>>> {
    let story = owned_story(&state, auth_user.user_id, id).await?;
    ensure_story_publishable(&story.status)?;

    // `None` here means a concurrent request published it first.
    let story = StoryRepo::publish(&state.pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::Conflict("Story is already published".into()))
    })?;

    tracing::info!(
        story_id = id,
        publish_order = ?story.publish_order,
        "Story published"
    );
    state.event_bus.publish(
        StoryEvent::new(STORY_PUBLISHED)
            .with_story(id)
            .with_actor(auth_user.user_id)
            .with_payload(serde_json::json!({ "story_title": story.title })),
    );

    Ok(Json(DataResponse { data: story }))
}

/// POST /api/v1/stories/{id}/unpublish
///
/// Moves a published story to `archived`. Its publish order is kept.
pub async fn unpublish(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Story>>> {
    let story = owned_story(&state, auth_user.user_id, id).await?;
    ensure_story_unpublishable(&story.status)?;

    let story = StoryRepo::unpublish(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Conflict("Story is not published".into())))?;

    tracing::info!(story_id = id, "Story unpublished");
    Ok(Json(DataResponse { data: story }))
}

/// POST /api/v1/stories/{id}/cover
///
/// Multipart upload (`file`) replacing the cover image.
pub async fn upload_cover(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<Story>>> {
    state.storage()?;
    let story = owned_story(&state, auth_user.user_id, id).await?;
    let image = read_image(multipart).await?;

    let name = chatstory_cloud::storage::object_name(&format!("cover-{id}"), &image.filename);
    let stored = store(&state, &name, &image.content_type, image.bytes).await?;

    replace_cover(&state, story, stored).await
}

/// POST /api/v1/stories/{id}/cover/generate
///
/// Generate a cover with the image model and store it like an upload.
pub async fn generate_cover(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<GenerateCoverRequest>,
) -> AppResult<Json<DataResponse<Story>>> {
    let ai = state.ai()?.clone();
    state.storage()?;
    let story = owned_story(&state, auth_user.user_id, id).await?;

    let prompt = match input.prompt.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => cover_image_prompt(
            &story.title,
            story.description.as_deref(),
            story.genre.as_deref(),
        ),
    };

    tracing::info!(story_id = id, "Generating cover image");
    let bytes = ai.generate_image(&prompt).await?;

    let name = chatstory_cloud::storage::object_name(&format!("cover-{id}"), "generated.png");
    let stored = store(&state, &name, "image/png", bytes).await?;

    replace_cover(&state, story, stored).await
}

/// Point the story at a freshly stored cover and drop the previous file.
///
/// If the story vanished or the update failed, the new file is dropped instead.
async fn replace_cover(
    state: &AppState,
    story: Story,
    stored: StoredFile,
) -> AppResult<Json<DataResponse<Story>>> {
    let result = StoryRepo::set_cover(&state.pool, story.id, &stored.url, &stored.file_id)
        .await
        .map_err(AppError::from)
        .and_then(|updated| updated.ok_or_else(|| not_found("Story", story.id)));
    let updated = discard_on_error(state, &stored, "story", story.id, result).await?;
    discard_file(state, story.cover_file_id, "story", story.id).await;
    Ok(Json(DataResponse { data: updated }))
}
