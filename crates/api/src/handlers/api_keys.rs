//! Handlers for per-user API key management.
//!
//! The plaintext key is returned **only** on creation; listings expose the
//! `key_prefix` for identification. Keys cannot manage other keys: these
//! endpoints require a session login.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chatstory_core::api_keys::{
    generate_api_key, resolve_expiry, validate_key_name, MAX_ACTIVE_KEYS_PER_USER,
};
use chatstory_core::error::CoreError;
use chatstory_core::types::DbId;
use chatstory_db::models::api_key::{ApiKeyCreatedResponse, CreateApiKey};
use chatstory_db::repositories::ApiKeyRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::{AuthMethod, AuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

fn require_session(auth_user: &AuthUser) -> AppResult<()> {
    match auth_user.method {
        AuthMethod::Session => Ok(()),
        AuthMethod::ApiKey { .. } => Err(AppError::Core(CoreError::Forbidden(
            "API keys cannot be managed with an API key".into(),
        ))),
    }
}

/// POST /api/v1/api-keys
///
/// Generate a new API key. The plaintext key is returned exactly once.
pub async fn create_api_key(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateApiKey>,
) -> AppResult<impl IntoResponse> {
    require_session(&auth_user)?;
    validate_key_name(&input.name)?;
    let expires_at = resolve_expiry(input.expires_in_days)?;

    let active = ApiKeyRepo::count_active(&state.pool, auth_user.user_id).await?;
    if active >= MAX_ACTIVE_KEYS_PER_USER {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "At most {MAX_ACTIVE_KEYS_PER_USER} active API keys are allowed"
        ))));
    }

    let generated = generate_api_key();
    let key = ApiKeyRepo::create(
        &state.pool,
        auth_user.user_id,
        input.name.trim(),
        &generated.prefix,
        &generated.hash,
        expires_at,
    )
    .await?;

    tracing::info!(
        api_key_id = key.id,
        key_prefix = %generated.prefix,
        user_id = auth_user.user_id,
        "API key created",
    );

    let response = ApiKeyCreatedResponse {
        id: key.id,
        name: key.name,
        key_prefix: generated.prefix,
        plaintext_key: generated.plaintext,
        expires_at: key.expires_at,
        created_at: key.created_at,
    };

    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /api/v1/api-keys
///
/// List the caller's keys. Shows prefix only, never the full key.
pub async fn list_api_keys(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    require_session(&auth_user)?;
    let keys = ApiKeyRepo::list_by_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse { data: keys }))
}

/// DELETE /api/v1/api-keys/{id}
pub async fn delete_api_key(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(key_id): Path<DbId>,
) -> AppResult<StatusCode> {
    require_session(&auth_user)?;
    if !ApiKeyRepo::delete(&state.pool, key_id, auth_user.user_id).await? {
        return Err(not_found("ApiKey", key_id));
    }

    tracing::info!(api_key_id = key_id, user_id = auth_user.user_id, "API key deleted");
    Ok(StatusCode::NO_CONTENT)
}
