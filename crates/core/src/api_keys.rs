//! API key material: generation, hashing and expiry rules.
//!
//! Keys are shown to their owner exactly once. Only the SHA-256 digest and a
//! short display prefix are persisted.

use chrono::{Duration, Utc};
use rand::Rng;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Marker prepended to every key so bearer tokens can be told apart from JWTs.
pub const KEY_MARKER: &str = "csk_";

/// Number of random alphanumeric characters after the marker.
pub const KEY_RANDOM_LENGTH: usize = 40;

/// Number of leading characters (marker included) stored for display.
pub const KEY_PREFIX_LENGTH: usize = 12;

/// Maximum number of active keys a single user may hold.
pub const MAX_ACTIVE_KEYS_PER_USER: i64 = 10;

/// Upper bound for `expires_in_days` on creation.
pub const MAX_EXPIRY_DAYS: i64 = 365;

/// Length of password-reset tokens.
pub const RESET_TOKEN_LENGTH: usize = 48;

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// The result of generating a new API key.
pub struct GeneratedApiKey {
    /// The plaintext key (returned once, never stored).
    pub plaintext: String,
    /// The first [`KEY_PREFIX_LENGTH`] characters of the key.
    pub prefix: String,
    /// SHA-256 hex digest of the plaintext (stored).
    pub hash: String,
}

/// Generate a new random API key of the form `csk_<40 alphanumerics>`.
pub fn generate_api_key() -> GeneratedApiKey {
    let plaintext = format!("{KEY_MARKER}{}", random_alphanumeric(KEY_RANDOM_LENGTH));
    let prefix = extract_prefix(&plaintext).to_string();
    let hash = hash_api_key(&plaintext);

    GeneratedApiKey {
        plaintext,
        prefix,
        hash,
    }
}

/// Random string drawn from `[A-Za-z0-9]`.
pub fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Hashing / inspection
// ---------------------------------------------------------------------------

/// Compute the SHA-256 hex digest of an API key.
pub fn hash_api_key(key: &str) -> String {
    crate::hashing::sha256_hex(key.as_bytes())
}

/// Extract the display prefix from a plaintext key.
pub fn extract_prefix(key: &str) -> &str {
    let end = key
        .char_indices()
        .nth(KEY_PREFIX_LENGTH)
        .map(|(i, _)| i)
        .unwrap_or(key.len());
    &key[..end]
}

/// Whether a bearer credential looks like an API key rather than a JWT.
pub fn is_api_key(token: &str) -> bool {
    token.starts_with(KEY_MARKER)
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

/// Resolve `expires_in_days` into an absolute expiry.
///
/// `None` means the key never expires.
pub fn resolve_expiry(expires_in_days: Option<i64>) -> Result<Option<Timestamp>, CoreError> {
    match expires_in_days {
        None => Ok(None),
        Some(days) if (1..=MAX_EXPIRY_DAYS).contains(&days) => {
            Ok(Some(Utc::now() + Duration::days(days)))
        }
        Some(_) => Err(CoreError::Validation(format!(
            "expires_in_days must be between 1 and {MAX_EXPIRY_DAYS}"
        ))),
    }
}

/// Validate an API key display name (non-empty, at most 100 characters).
pub fn validate_key_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("name must not be empty".into()));
    }
    if trimmed.chars().count() > 100 {
        return Err(CoreError::Validation(
            "name must be at most 100 characters".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn generated_key_has_marker_and_length() {
        let key = generate_api_key();
        assert!(key.plaintext.starts_with(KEY_MARKER));
        assert_eq!(key.plaintext.len(), KEY_MARKER.len() + KEY_RANDOM_LENGTH);
        assert!(is_api_key(&key.plaintext));
    }

    #[test]
    fn prefix_is_leading_slice_of_key() {
        let key = generate_api_key();
        assert_eq!(key.prefix.len(), KEY_PREFIX_LENGTH);
        assert!(key.plaintext.starts_with(&key.prefix));
    }

    #[test]
    fn stored_hash_matches_rehash() {
        let key = generate_api_key();
        assert_eq!(key.hash, hash_api_key(&key.plaintext));
        assert_ne!(key.hash, key.plaintext);
    }

    #[test]
    fn two_keys_differ() {
        assert_ne!(generate_api_key().plaintext, generate_api_key().plaintext);
    }

    #[test]
    fn extract_prefix_handles_short_input() {
        assert_eq!(extract_prefix("csk_ab"), "csk_ab");
    }

    #[test]
    fn jwt_is_not_api_key() {
        assert!(!is_api_key("eyJhbGciOiJIUzI1NiJ9.e30.sig"));
    }

    #[test]
    fn resolve_expiry_none_never_expires() {
        assert_matches!(resolve_expiry(None), Ok(None));
    }

    #[test]
    fn resolve_expiry_in_future() {
        let expiry = resolve_expiry(Some(30)).unwrap().unwrap();
        assert!(expiry > Utc::now() + Duration::days(29));
    }

    #[test]
    fn resolve_expiry_rejects_out_of_range() {
        assert_matches!(resolve_expiry(Some(0)), Err(CoreError::Validation(_)));
        assert_matches!(resolve_expiry(Some(366)), Err(CoreError::Validation(_)));
    }

    #[test]
    fn key_name_rules() {
        assert!(validate_key_name("ci-bot").is_ok());
        assert!(validate_key_name("   ").is_err());
        assert!(validate_key_name(&"k".repeat(101)).is_err());
    }
}
