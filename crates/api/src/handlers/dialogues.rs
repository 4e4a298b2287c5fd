//! Handlers for the ordered dialogue lines of a chapter.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chatstory_core::story::{
    validate_dialogue_kind, validate_required, MAX_DIALOGUE_LEN,
};
use chatstory_core::types::DbId;
use chatstory_db::models::dialogue::{
    CreateDialogue, Dialogue, DialogueWithCharacter, UpdateDialogue,
};
use chatstory_db::repositories::{CharacterRepo, DialogueRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::{not_found, owned_chapter};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// A speaker must be a character of the chapter's own story.
async fn check_speaker(state: &AppState, story_id: DbId, character_id: DbId) -> AppResult<()> {
    let belongs = CharacterRepo::find_by_id(&state.pool, character_id)
        .await?
        .is_some_and(|c| c.story_id == story_id);
    if !belongs {
        return Err(AppError::BadRequest(format!(
            "Character {character_id} does not belong to this story"
        )));
    }
    Ok(())
}

/// Validate and append a line to a chapter the caller owns.
pub(crate) async fn create_dialogue(
    state: &AppState,
    user_id: DbId,
    chapter_id: DbId,
    input: &CreateDialogue,
) -> AppResult<Dialogue> {
    validate_required("content", &input.content, MAX_DIALOGUE_LEN)?;
    if let Some(kind) = &input.kind {
        validate_dialogue_kind(kind)?;
    }

    let (story, _) = owned_chapter(state, user_id, chapter_id).await?;
    if let Some(character_id) = input.character_id {
        check_speaker(state, story.id, character_id).await?;
    }

    let dialogue = DialogueRepo::create(&state.pool, chapter_id, input).await?;
    tracing::debug!(
        dialogue_id = dialogue.id,
        chapter_id,
        position = dialogue.position,
        "Dialogue created"
    );
    Ok(dialogue)
}

async fn owned_dialogue(state: &AppState, user_id: DbId, id: DbId) -> AppResult<(DbId, Dialogue)> {
    let dialogue = DialogueRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Dialogue", id))?;
    let (story, _) = owned_chapter(state, user_id, dialogue.chapter_id).await?;
    Ok((story.id, dialogue))
}

/// POST /api/v1/chapters/{id}/dialogues
pub async fn create(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(chapter_id): Path<DbId>,
    Json(input): Json<CreateDialogue>,
) -> AppResult<(StatusCode, Json<DataResponse<Dialogue>>)> {
    let dialogue = create_dialogue(&state, auth_user.user_id, chapter_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: dialogue })))
}

/// GET /api/v1/chapters/{id}/dialogues
pub async fn list_by_chapter(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(chapter_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<DialogueWithCharacter>>>> {
    owned_chapter(&state, auth_user.user_id, chapter_id).await?;
    let dialogues = DialogueRepo::list_by_chapter(&state.pool, chapter_id).await?;
    Ok(Json(DataResponse { data: dialogues }))
}

/// PUT /api/v1/dialogues/{id}
pub async fn update(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDialogue>,
) -> AppResult<Json<DataResponse<Dialogue>>> {
    if let Some(content) = &input.content {
        validate_required("content", content, MAX_DIALOGUE_LEN)?;
    }
    if let Some(kind) = &input.kind {
        validate_dialogue_kind(kind)?;
    }
    if input.position.is_some_and(|p| p < 1) {
        return Err(AppError::BadRequest("position must be at least 1".into()));
    }

    let (story_id, _) = owned_dialogue(&state, auth_user.user_id, id).await?;
    if let Some(character_id) = input.character_id {
        check_speaker(&state, story_id, character_id).await?;
    }

    let dialogue = DialogueRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("Dialogue", id))?;
    Ok(Json(DataResponse { data: dialogue }))
}

/// DELETE /api/v1/dialogues/{id}
pub async fn delete(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    owned_dialogue(&state, auth_user.user_id, id).await?;
    if !DialogueRepo::delete(&state.pool, id).await? {
        return Err(not_found("Dialogue", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
