//! Dual authentication extractor for Axum handlers.
//!
//! A request authenticates either with a personal API key (`X-API-Key`
//! header, or `Authorization: Bearer csk_...`) or with a session access
//! token (`Authorization: Bearer <jwt>` or the session cookie). API keys are
//! checked first so that scripts never fall through to JWT parsing.
//!
//! Both paths consult the database: a deactivated account is rejected even
//! while its access token is still within its lifetime.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chatstory_core::api_keys::{hash_api_key, is_api_key};
use chatstory_core::error::CoreError;
use chatstory_core::roles::ROLE_ADMIN;
use chatstory_core::types::DbId;
use chatstory_db::repositories::{ApiKeyRepo, UserRepo};

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Cookie carrying the access token for browser sessions.
pub const SESSION_COOKIE: &str = "chatstory_session";

/// Header carrying a personal API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// How the caller proved their identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Session,
    ApiKey { key_id: DbId },
}

/// Authenticated user extracted from an API key or a session token.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    /// `"admin"` or `"user"`.
    pub role: String,
    pub method: AuthMethod,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// A credential found on the request, before verification.
#[derive(Debug, PartialEq, Eq)]
enum Credential<'a> {
    ApiKey(&'a str),
    Session(&'a str),
}

/// Pick the credential to verify.
///
/// Returns `Ok(None)` when the request carries no credential at all, and an
/// error when the `Authorization` header is present but malformed.
fn extract_credential(headers: &HeaderMap) -> Result<Option<Credential<'_>>, CoreError> {
    if let Some(key) = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Ok(Some(Credential::ApiKey(key)));
    }

    if let Some(header) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let token = header.strip_prefix("Bearer ").map(str::trim).ok_or_else(|| {
            CoreError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".into())
        })?;
        if is_api_key(token) {
            return Ok(Some(Credential::ApiKey(token)));
        }
        return Ok(Some(Credential::Session(token)));
    }

    Ok(session_cookie(headers).map(Credential::Session))
}

/// Read the session cookie from the `Cookie` header(s).
fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

async fn verify(credential: Credential<'_>, state: &AppState) -> Result<AuthUser, AppError> {
    match credential {
        Credential::ApiKey(key) => {
            let owner = ApiKeyRepo::find_owner_by_hash(&state.pool, &hash_api_key(key))
                .await?
                .ok_or_else(|| {
                    AppError::Core(CoreError::Unauthorized("Invalid or expired API key".into()))
                })?;

            if let Err(e) = ApiKeyRepo::touch_usage(&state.pool, owner.key_id).await {
                tracing::warn!(error = %e, api_key_id = owner.key_id, "Failed to record API key usage");
            }

            Ok(AuthUser {
                user_id: owner.user_id,
                role: owner.role,
                method: AuthMethod::ApiKey {
                    key_id: owner.key_id,
                },
            })
        }
        Credential::Session(token) => {
            let claims = validate_token(token, &state.config.jwt).map_err(|_| {
                AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
            })?;

            // Deactivation takes effect before the token expires, and role
            // changes apply immediately.
            let role = UserRepo::find_active_role(&state.pool, claims.sub)
                .await?
                .ok_or_else(|| {
                    AppError::Core(CoreError::Unauthorized("Account is disabled".into()))
                })?;
            Ok(AuthUser {
                user_id: claims.sub,
                role,
                method: AuthMethod::Session,
            })
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = extract_credential(&parts.headers)?.ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Authentication required: provide a session token or an API key".into(),
            ))
        })?;
        verify(credential, state).await
    }
}

/// The caller, if they presented valid credentials.
///
/// Used by public endpoints that personalise their output. Invalid
/// credentials are treated as anonymous rather than rejected.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<AuthUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(Some(credential)) = extract_credential(&parts.headers) else {
            return Ok(OptionalAuth(None));
        };
        match verify(credential, state).await {
            Ok(user) => Ok(OptionalAuth(Some(user))),
            Err(AppError::Core(CoreError::Unauthorized(reason))) => {
                tracing::debug!(%reason, "Ignoring invalid credentials on public endpoint");
                Ok(OptionalAuth(None))
            }
            Err(e) => Err(e),
        }
    }
}
