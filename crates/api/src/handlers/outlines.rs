//! Handlers for story outlines (ordered planning notes).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chatstory_core::error::CoreError;
use chatstory_core::story::{validate_max_len, validate_title, MAX_OUTLINE_LEN};
use chatstory_core::types::DbId;
use chatstory_db::models::outline::{CreateOutline, Outline, UpdateOutline};
use chatstory_db::repositories::OutlineRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::{not_found, owned_story};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

fn validate_content(content: Option<&str>) -> Result<(), CoreError> {
    match content {
        Some(c) => validate_max_len("content", c, MAX_OUTLINE_LEN),
        None => Ok(()),
    }
}

/// Validate and append an outline entry to a story the caller owns.
pub(crate) async fn create_outline(
    state: &AppState,
    user_id: DbId,
    story_id: DbId,
    input: &CreateOutline,
) -> AppResult<Outline> {
    validate_title(&input.title)?;
    validate_content(input.content.as_deref())?;
    owned_story(state, user_id, story_id).await?;

    let outline = OutlineRepo::create(&state.pool, story_id, input).await?;
    tracing::debug!(outline_id = outline.id, story_id, "Outline created");
    Ok(outline)
}

async fn owned_outline(state: &AppState, user_id: DbId, id: DbId) -> AppResult<Outline> {
    let outline = OutlineRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Outline", id))?;
    owned_story(state, user_id, outline.story_id).await?;
    Ok(outline)
}

/// POST /api/v1/stories/{id}/outlines
pub async fn create(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
    Json(input): Json<CreateOutline>,
) -> AppResult<(StatusCode, Json<DataResponse<Outline>>)> {
    let outline = create_outline(&state, auth_user.user_id, story_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outline })))
}

/// GET /api/v1/stories/{id}/outlines
pub async fn list_by_story(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Outline>>>> {
    owned_story(&state, auth_user.user_id, story_id).await?;
    let outlines = OutlineRepo::list_by_story(&state.pool, story_id).await?;
    Ok(Json(DataResponse { data: outlines }))
}

/// PUT /api/v1/outlines/{id}
pub async fn update(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateOutline>,
) -> AppResult<Json<DataResponse<Outline>>> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    validate_content(input.content.as_deref())?;
    if input.position.is_some_and(|p| p < 1) {
        return Err(AppError::Core(CoreError::Validation(
            "position must be at least 1".into(),
        )));
    }

    owned_outline(&state, auth_user.user_id, id).await?;
    let outline = OutlineRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("Outline", id))?;
    Ok(Json(DataResponse { data: outline }))
}

/// DELETE /api/v1/outlines/{id}
pub async fn delete(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    owned_outline(&state, auth_user.user_id, id).await?;
    if !OutlineRepo::delete(&state.pool, id).await? {
        return Err(not_found("Outline", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
