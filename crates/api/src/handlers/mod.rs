//! Request handlers, one submodule per resource.
//!
//! Handlers delegate to the repositories in `chatstory_db` and map errors via
//! [`AppError`]. Mutations that the chat assistant can also trigger live in
//! crate-visible functions (`create_story`, `create_chapter`, ...) so both
//! entry points share validation and ownership checks.

pub mod api_keys;
pub mod auth;
pub mod badges;
pub mod bookmarks;
pub mod chapters;
pub mod characters;
pub mod chat;
pub mod comments;
pub mod dialogues;
pub mod favorites;
pub mod library;
pub mod notifications;
pub mod outlines;
pub mod payments;
pub mod stories;
pub mod uploads;

use chatstory_core::error::CoreError;
use chatstory_core::types::DbId;
use chatstory_db::models::chapter::Chapter;
use chatstory_db::models::story::Story;
use chatstory_db::repositories::{ChapterRepo, StoryRepo};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub(crate) fn not_found(entity: &'static str, id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity, id })
}

/// Load a story the caller owns: 404 if missing, 403 if someone else's.
pub(crate) async fn owned_story(state: &AppState, user_id: DbId, story_id: DbId) -> AppResult<Story> {
    let story = StoryRepo::find_by_id(&state.pool, story_id)
        .await?
        .ok_or_else(|| not_found("Story", story_id))?;
    if story.user_id != user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not own this story".into(),
        )));
    }
    Ok(story)
}

/// Load a chapter whose story the caller owns.
pub(crate) async fn owned_chapter(
    state: &AppState,
    user_id: DbId,
    chapter_id: DbId,
) -> AppResult<(Story, Chapter)> {
    let chapter = ChapterRepo::find_by_id(&state.pool, chapter_id)
        .await?
        .ok_or_else(|| not_found("Chapter", chapter_id))?;
    let story = owned_story(state, user_id, chapter.story_id).await?;
    Ok((story, chapter))
}
