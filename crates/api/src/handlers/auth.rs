//! Handlers for the `/auth` and `/users/me` resources.

use axum::extract::{Multipart, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chatstory_core::api_keys::{random_alphanumeric, RESET_TOKEN_LENGTH};
use chatstory_core::error::CoreError;
use chatstory_core::hashing::sha256_hex;
use chatstory_core::types::DbId;
use chatstory_db::models::session::CreateSession;
use chatstory_db::models::user::{CreateUser, UpdateProfile, User};
use chatstory_db::repositories::{SessionRepo, UserRepo};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::handlers::uploads::{discard_file, discard_on_error, read_image, store};
use crate::handlers::not_found;
use crate::middleware::auth::{AuthUser, SESSION_COOKIE};
use crate::response::DataResponse;
use crate::state::AppState;

/// Password reset links stay valid for one hour.
const RESET_TOKEN_VALID_MINUTES: i64 = 60;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
}

/// Request body for `POST /auth/login`. `login` is a username or an email.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request body for `PUT /auth/me`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: Option<String>,
    pub email_notifications: Option<bool>,
}

/// Request body for `PUT /auth/password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Request body for `POST /auth/forgot-password`.
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
}

/// Request body for `POST /auth/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Successful authentication response returned by register, login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Public user info embedded in [`AuthResponse`].
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub has_badge: bool,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            avatar_url: user.avatar_url.clone(),
            has_badge: user.has_badge,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}

/// Usernames are 3-32 characters of ASCII letters, digits and underscores.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    let charset_ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !(3..=32).contains(&len) || !charset_ok {
        return Err(ValidationError::new("username").with_message(
            "username must be 3-32 characters of letters, digits or underscores".into(),
        ));
    }
    Ok(())
}

fn validation_error(errors: validator::ValidationErrors) -> AppError {
    AppError::Core(CoreError::Validation(errors.to_string()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account and sign it in.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate().map_err(validation_error)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username.clone(),
            email: input.email.trim().to_lowercase(),
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    let response = create_auth_response(&state, &user).await?;
    let cookie = session_cookie(&response.access_token, response.expires_in);
    Ok((StatusCode::CREATED, [(SET_COOKIE, cookie)], Json(response)))
}

/// POST /api/v1/auth/login
///
/// Authenticate with username or email + password.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let invalid = || {
        AppError::Core(CoreError::Unauthorized(
            "Invalid username/email or password".into(),
        ))
    };

    let user = UserRepo::find_by_login(&state.pool, input.login.trim())
        .await?
        .ok_or_else(invalid)?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(invalid());
    }

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let response = create_auth_response(&state, &user).await?;
    let cookie = session_cookie(&response.access_token, response.expires_in);
    Ok(([(SET_COOKIE, cookie)], Json(response)))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for a new token pair (rotation).
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<impl IntoResponse> {
    let token_hash = hash_refresh_token(&input.refresh_token);

    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    // A concurrent refresh with the same token loses the race here.
    if !SessionRepo::revoke(&state.pool, session.id).await? {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid or expired refresh token".into(),
        )));
    }

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let response = create_auth_response(&state, &user).await?;
    let cookie = session_cookie(&response.access_token, response.expires_in);
    Ok(([(SET_COOKIE, cookie)], Json(response)))
}

/// POST /api/v1/auth/logout
///
/// Revoke all sessions of the caller and clear the session cookie.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    tracing::info!(user_id = auth_user.user_id, revoked, "User logged out");
    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, session_cookie("", 0))],
    ))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<User>>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| not_found("User", auth_user.user_id))?;
    Ok(Json(DataResponse { data: user }))
}

/// PUT /api/v1/auth/me
pub async fn update_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UpdateProfileRequest>,
) -> AppResult<Json<DataResponse<User>>> {
    input.validate().map_err(validation_error)?;

    let update = UpdateProfile {
        username: input.username,
        email_notifications: input.email_notifications,
    };
    let user = UserRepo::update_profile(&state.pool, auth_user.user_id, &update)
        .await?
        .ok_or_else(|| not_found("User", auth_user.user_id))?;
    Ok(Json(DataResponse { data: user }))
}

/// PUT /api/v1/auth/password
///
/// Change the password. Every session is revoked afterwards.
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| not_found("User", auth_user.user_id))?;

    let current_ok = verify_password(&input.current_password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !current_ok {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Current password is incorrect".into(),
        )));
    }

    set_password(&state, user.id, &input.new_password).await?;
    tracing::info!(user_id = user.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/forgot-password
///
/// Always answers 202 so the endpoint does not reveal which emails exist.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<ForgotPasswordRequest>,
) -> AppResult<StatusCode> {
    input.validate().map_err(validation_error)?;

    let Some(user) = UserRepo::find_by_email(&state.pool, input.email.trim()).await? else {
        tracing::debug!("Password reset requested for unknown email");
        return Ok(StatusCode::ACCEPTED);
    };
    if !user.is_active {
        return Ok(StatusCode::ACCEPTED);
    }

    let token = random_alphanumeric(RESET_TOKEN_LENGTH);
    let expires_at = Utc::now() + chrono::Duration::minutes(RESET_TOKEN_VALID_MINUTES);
    SessionRepo::create_password_reset(&state.pool, user.id, &sha256_hex(token.as_bytes()), expires_at)
        .await?;

    let Some(email) = state.email.as_ref() else {
        tracing::warn!(user_id = user.id, "Password reset requested but email is not configured");
        return Ok(StatusCode::ACCEPTED);
    };

    let reset_url = reset_link(&state.config.app_base_url, &token)?;
    if let Err(e) = email
        .send_password_reset(&user.email, &reset_url, RESET_TOKEN_VALID_MINUTES)
        .await
    {
        tracing::error!(error = %e, user_id = user.id, "Failed to send password reset email");
    } else {
        tracing::info!(user_id = user.id, "Password reset email sent");
    }

    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/auth/reset-password
///
/// Consume a reset token (single use) and set a new password.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password_strength(&input.new_password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let user_id =
        SessionRepo::consume_password_reset(&state.pool, &sha256_hex(input.token.trim().as_bytes()))
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".into()))?;

    set_password(&state, user_id, &input.new_password).await?;
    tracing::info!(user_id, "Password reset completed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/users/me/avatar
///
/// Multipart upload (`file`) replacing the caller's avatar.
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth_user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<AvatarResponse>>> {
    state.storage()?;
    let image = read_image(multipart).await?;

    let name = chatstory_cloud::storage::object_name(
        &format!("avatar-{}", auth_user.user_id),
        &image.filename,
    );
    let stored = store(&state, &name, &image.content_type, image.bytes).await?;

    let result = UserRepo::set_avatar(&state.pool, auth_user.user_id, &stored.url, &stored.file_id)
        .await
        .map_err(AppError::from);
    let previous = discard_on_error(&state, &stored, "user", auth_user.user_id, result).await?;
    discard_file(&state, previous, "user", auth_user.user_id).await;

    Ok(Json(DataResponse {
        data: AvatarResponse {
            avatar_url: stored.url,
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate access + refresh tokens, persist a session row, and build the response.
async fn create_auth_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let access_token = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();

    let session_input = CreateSession {
        user_id: user.id,
        refresh_token_hash: refresh_hash,
        expires_at: state.config.jwt.refresh_expires_at(),
        user_agent: None,
    };
    SessionRepo::create(&state.pool, &session_input).await?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in: state.config.jwt.access_ttl_secs(),
        user: UserInfo::from(user),
    })
}

/// Validate, hash and store a new password, then revoke every session.
async fn set_password(state: &AppState, user_id: DbId, new_password: &str) -> AppResult<()> {
    validate_password_strength(new_password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let hash = hash_password(new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    if !UserRepo::update_password(&state.pool, user_id, &hash).await? {
        return Err(not_found("User", user_id));
    }
    SessionRepo::revoke_all_for_user(&state.pool, user_id).await?;
    Ok(())
}

/// `Set-Cookie` value for the session cookie. `max_age = 0` clears it.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

/// Link to the web app's reset page carrying `token`.
fn reset_link(app_base_url: &str, token: &str) -> AppResult<String> {
    let mut url = url::Url::parse(&format!("{app_base_url}/reset-password"))
        .map_err(|e| AppError::InternalError(format!("Invalid APP_BASE_URL: {e}")))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}
