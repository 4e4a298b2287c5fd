//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope, except the token
//! responses of the auth endpoints.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
