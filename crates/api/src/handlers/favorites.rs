//! Handlers for story favourites.

use axum::extract::{Path, State};
use axum::Json;
use chatstory_core::types::DbId;
use chatstory_db::models::favorite::FavoriteStory;
use chatstory_db::repositories::{FavoriteRepo, StoryRepo};
use chatstory_events::bus::STORY_FAVORITED;
use chatstory_events::StoryEvent;
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::not_found;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FavoriteToggled {
    pub favorited: bool,
}

/// POST /api/v1/library/stories/{id}/favorite
///
/// Toggles the favourite. Only adding one notifies the author.
pub async fn toggle(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(story_id): Path<DbId>,
) -> AppResult<Json<DataResponse<FavoriteToggled>>> {
    let story = StoryRepo::find_published(&state.pool, story_id)
        .await?
        .ok_or_else(|| not_found("Story", story_id))?;

    let favorited = FavoriteRepo::toggle(&state.pool, auth_user.user_id, story_id).await?;
    tracing::debug!(story_id, user_id = auth_user.user_id, favorited, "Favourite toggled");

    if favorited {
        state.event_bus.publish(
            StoryEvent::new(STORY_FAVORITED)
                .with_story(story_id)
                .with_actor(auth_user.user_id)
                .with_payload(serde_json::json!({
                    "story_title": story.title,
                    "owner_id": story.author_id,
                })),
        );
    }

    Ok(Json(DataResponse {
        data: FavoriteToggled { favorited },
    }))
}

/// GET /api/v1/favorites
pub async fn list_mine(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<FavoriteStory>>>> {
    let favorites = FavoriteRepo::list_by_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse { data: favorites }))
}
