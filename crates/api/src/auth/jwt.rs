//! Session tokens for readers and authors.
//!
//! Logging in yields a short-lived signed access token plus a long-lived
//! refresh token. The access token travels as a Bearer header or the session
//! cookie; the refresh token is exchanged at `/auth/refresh` and rotated on
//! every use. Sessions only ever store the refresh token's digest.

use chatstory_core::hashing::sha256_hex;
use chatstory_core::types::{DbId, Timestamp};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Payload of an access token.
///
/// `role` is informational; request authentication re-reads the account.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: DbId,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Signing secret and token lifetimes.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// Read `JWT_SECRET` (required), `JWT_ACCESS_EXPIRY_MINS` (default 60)
    /// and `JWT_REFRESH_EXPIRY_DAYS` (default 30).
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        assert!(!secret.is_empty(), "JWT_SECRET must be set");

        Self {
            secret,
            access_token_expiry_mins: lifetime_from_env("JWT_ACCESS_EXPIRY_MINS", 60),
            refresh_token_expiry_days: lifetime_from_env("JWT_REFRESH_EXPIRY_DAYS", 30),
        }
    }

    /// Access token lifetime in seconds, as reported to clients.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }

    /// When a session created now stops accepting its refresh token.
    pub fn refresh_expires_at(&self) -> Timestamp {
        Utc::now() + Duration::days(self.refresh_token_expiry_days)
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.as_bytes())
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.as_bytes())
    }
}

fn lifetime_from_env(var: &str, default: i64) -> i64 {
    match std::env::var(var) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(value) if value > 0 => value,
            _ => panic!("{var} must be a positive integer, got {raw:?}"),
        },
        Err(_) => default,
    }
}

/// Sign an access token for `user_id`.
pub fn generate_access_token(
    user_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let issued = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_owned(),
        exp: issued + config.access_ttl_secs(),
        iat: issued,
        jti: Uuid::new_v4().to_string(),
    };
    encode(&Header::new(ALGORITHM), &claims, &config.encoding_key())
}

/// Check signature and expiry, then return the payload.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(token, &config.decoding_key(), &Validation::new(ALGORITHM))
        .map(|data| data.claims)
}

/// A fresh refresh token and its digest, as `(plaintext, digest)`.
pub fn generate_refresh_token() -> (String, String) {
    let plaintext = [Uuid::new_v4(), Uuid::new_v4()]
        .iter()
        .map(|id| id.simple().to_string())
        .collect::<String>();
    let digest = hash_refresh_token(&plaintext);
    (plaintext, digest)
}

pub fn hash_refresh_token(token: &str) -> String {
    sha256_hex(token.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn sign(claims: &Claims, config: &JwtConfig) -> String {
        encode(&Header::new(ALGORITHM), claims, &config.encoding_key()).unwrap()
    }

    #[test]
    fn access_token_carries_user_and_lifetime() {
        let config = config("chatstory-signing-secret");
        let token = generate_access_token(7, "user", &config).unwrap();

        let claims = validate_token(&token, &config).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, "user");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert!(Uuid::parse_str(&claims.jti).is_ok());
    }

    #[test]
    fn each_login_gets_its_own_jti() {
        let config = config("chatstory-signing-secret");
        let a = validate_token(&generate_access_token(7, "user", &config).unwrap(), &config);
        let b = validate_token(&generate_access_token(7, "user", &config).unwrap(), &config);
        assert_ne!(a.unwrap().jti, b.unwrap().jti);
    }

    #[test]
    fn token_past_expiry_is_rejected() {
        let config = config("chatstory-signing-secret");
        // Outside the decoder's 60 second leeway.
        let issued = Utc::now().timestamp() - 3600;
        let stale = Claims {
            sub: 7,
            role: "user".to_string(),
            exp: issued + 900,
            iat: issued,
            jti: Uuid::new_v4().to_string(),
        };

        assert!(validate_token(&sign(&stale, &config), &config).is_err());
    }

    #[test]
    fn token_from_another_deployment_is_rejected() {
        let ours = config("chatstory-signing-secret");
        let theirs = config("some-other-secret");
        let token = generate_access_token(7, "admin", &theirs).unwrap();

        assert!(validate_token(&token, &ours).is_err());
    }

    #[test]
    fn edited_payload_breaks_the_signature() {
        let config = config("chatstory-signing-secret");
        let token = generate_access_token(7, "user", &config).unwrap();
        let forged = generate_access_token(8, "admin", &config).unwrap();

        // Splice the second payload onto the first signature.
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        let spliced = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(validate_token(&spliced, &config).is_err());
    }

    #[test]
    fn refresh_token_is_hex_and_stored_as_digest() {
        let (plaintext, digest) = generate_refresh_token();

        assert_eq!(plaintext.len(), 64);
        assert!(plaintext.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(plaintext, digest);
        assert_eq!(digest, hash_refresh_token(&plaintext));
        assert_ne!(generate_refresh_token().0, plaintext);
    }

    #[test]
    fn refresh_expiry_follows_configured_days() {
        let config = config("chatstory-signing-secret");
        let remaining = config.refresh_expires_at() - Utc::now();

        assert!(remaining > Duration::days(7) - Duration::minutes(1));
        assert!(remaining <= Duration::days(7));
        assert_eq!(config.access_ttl_secs(), 900);
    }
}
