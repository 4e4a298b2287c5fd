//! Handlers for story characters.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chatstory_core::error::CoreError;
use chatstory_core::story::{
    validate_character_role, validate_max_len, validate_required, MAX_CHARACTER_FIELD_LEN,
    MAX_TITLE_LEN,
};
use chatstory_core::types::DbId;
use chatstory_db::models::character::{Character, CreateCharacter, UpdateCharacter};
use chatstory_db::repositories::CharacterRepo;

use crate::error::AppResult;
use crate::handlers::{not_found, owned_story};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Length-check the free-text profile fields shared by create and update.
fn validate_profile(fields: [(&str, Option<&str>); 5]) -> Result<(), CoreError> {
    for (name, value) in fields {
        if let Some(value) = value {
            validate_max_len(name, value, MAX_CHARACTER_FIELD_LEN)?;
        }
    }
    Ok(())
}

/// Validate and add a character to a story the caller owns.
pub(crate) async fn create_character(
    state: &AppState,
    user_id: DbId,
    story_id: DbId,
    input: &CreateCharacter,
) -> AppResult<Character> {
    validate_required("name", &input.name, MAX_TITLE_LEN)?;
    if let Some(role) = &input.role {
        validate_character_role(role)?;
    }
    validate_profile([
        ("description", input.description.as_deref()),
        ("gender", input.gender.as_deref()),
        ("personality", input.personality.as_deref()),
        ("appearance", input.appearance.as_deref()),
        ("background", input.background.as_deref()),
    ])?;
    owned_story(state, user_id, story_id).await?;

    let character = CharacterRepo::create(&state.pool, story_id, input).await?;
    tracing::debug!(character_id = character.id, story_id, "Character created");
    Ok(character)
}

async fn owned_character(state: &AppState, user_id: DbId, id: DbId) -> AppResult<Character> {
    let character = CharacterRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Character", id))?;
    owned_story(state, user_id, character.story_id).await?;
    Ok(character)
}

/// POST /api/v1/stories/{id}/characters
pub async fn create(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
    Json(input): Json<CreateCharacter>,
) -> AppResult<(StatusCode, Json<DataResponse<Character>>)> {
    let character = create_character(&state, auth_user.user_id, story_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: character })))
}

/// GET /api/v1/stories/{id}/characters
pub async fn list_by_story(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Character>>>> {
    owned_story(&state, auth_user.user_id, story_id).await?;
    let characters = CharacterRepo::list_by_story(&state.pool, story_id).await?;
    Ok(Json(DataResponse { data: characters }))
}

/// GET /api/v1/characters/{id}
pub async fn get_by_id(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Character>>> {
    let character = owned_character(&state, auth_user.user_id, id).await?;
    Ok(Json(DataResponse { data: character }))
}

/// PUT /api/v1/characters/{id}
pub async fn update(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCharacter>,
) -> AppResult<Json<DataResponse<Character>>> {
    if let Some(name) = &input.name {
        validate_required("name", name, MAX_TITLE_LEN)?;
    }
    if let Some(role) = &input.role {
        validate_character_role(role)?;
    }
    validate_profile([
        ("description", input.description.as_deref()),
        ("gender", input.gender.as_deref()),
        ("personality", input.personality.as_deref()),
        ("appearance", input.appearance.as_deref()),
        ("background", input.background.as_deref()),
    ])?;

    owned_character(&state, auth_user.user_id, id).await?;
    let character = CharacterRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("Character", id))?;
    Ok(Json(DataResponse { data: character }))
}

/// DELETE /api/v1/characters/{id}
///
/// The character's dialogue lines are kept without a speaker.
pub async fn delete(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    owned_character(&state, auth_user.user_id, id).await?;
    if !CharacterRepo::delete(&state.pool, id).await? {
        return Err(not_found("Character", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
