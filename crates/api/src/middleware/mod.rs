//! Authentication extractors.
//!
//! - [`auth::AuthUser`] -- Requires a session token or an API key.
//! - [`auth::OptionalAuth`] -- Resolves the caller when credentials are present.

pub mod auth;
