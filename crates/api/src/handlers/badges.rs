//! Free supporter-badge grant, enabled per deployment.

use axum::extract::State;
use axum::Json;
use chatstory_core::error::CoreError;
use chatstory_db::models::user::User;
use chatstory_db::repositories::UserRepo;
use chatstory_events::bus::BADGE_GRANTED;
use chatstory_events::StoryEvent;

use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/badges/free
///
/// 403 unless `FREE_BADGE_ENABLED` is set; 409 for users who already have it.
pub async fn grant_free(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<User>>> {
    if !state.config.free_badge_enabled {
        return Err(AppError::Core(CoreError::Forbidden(
            "Free badges are not available".into(),
        )));
    }

    if !UserRepo::grant_badge(&state.pool, auth_user.user_id).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "You already have the supporter badge".into(),
        )));
    }

    tracing::info!(user_id = auth_user.user_id, "Free badge granted");
    state
        .event_bus
        .publish(StoryEvent::new(BADGE_GRANTED).with_actor(auth_user.user_id));

    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| not_found("User", auth_user.user_id))?;
    Ok(Json(DataResponse { data: user }))
}
