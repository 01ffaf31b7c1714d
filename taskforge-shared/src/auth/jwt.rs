/// Session token issuance, validation, and revocation
///
/// Tokens are HS256 JWTs carrying the user id (`sub`) and issue time
/// (`iat`). Expiration is configurable and defaults to 24 hours.
///
/// Revocation is cache-backed: a revoked token is written to the cache
/// under `blacklist:<token>` with a TTL equal to its remaining lifetime,
/// so the blacklist entry self-expires exactly when the token would have
/// expired anyway and never grows unbounded. Revocation is best-effort:
/// a cache outage makes `revoke_token` a logged no-op and `is_revoked`
/// answer `false`, trading strict revocation for availability.
///
/// # Example
///
/// ```
/// use taskforge_shared::auth::jwt::{create_token, validate_token};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let secret = "a-secret-key-at-least-32-bytes-long!";
///
/// let token = create_token(user_id, secret, Duration::hours(24))?;
/// let claims = validate_token(&token, secret)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::{keys, CacheClient};

/// Token issuer claim, pinned on creation and checked on validation.
const ISSUER: &str = "taskforge";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    Create(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token failed validation for any other reason
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// JWT claims
///
/// - `sub`: user id
/// - `iss`: always "taskforge"
/// - `iat`: issue time (Unix seconds), compared against the user's
///   password-change timestamp during authentication
/// - `exp`: expiration time (Unix seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user id
    pub sub: Uuid,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims for a user with the given time to live
    pub fn new(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Seconds until this token expires; `None` if already expired
    pub fn remaining_lifetime(&self) -> Option<u64> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some((self.exp - now) as u64)
        } else {
            None
        }
    }
}

/// Signs a token for a user
///
/// # Arguments
///
/// * `user_id` - Subject of the token
/// * `secret` - HS256 signing secret (at least 32 bytes)
/// * `ttl` - Time to live (default policy: 24 hours, set by the caller's
///   configuration)
///
/// # Errors
///
/// Returns `TokenError::Create` if encoding fails.
pub fn create_token(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, TokenError> {
    let claims = Claims::new(user_id, ttl);
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, &claims, &key)
        .map_err(|e| TokenError::Create(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts its claims
///
/// Checks signature, expiration, and issuer. Expiration is reported as
/// `TokenError::Expired` so callers can surface "token expired" distinctly
/// from "invalid token".
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Revokes a token by blacklisting it for its remaining lifetime
///
/// Expired or malformed tokens are a no-op; they cannot authenticate
/// anyway. Cache failures are logged and swallowed: logout must succeed
/// from the caller's perspective even when the cache is down.
pub async fn revoke_token(cache: &CacheClient, token: &str, secret: &str) {
    let claims = match validate_token(token, secret) {
        Ok(claims) => claims,
        Err(TokenError::Expired) => return,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping revocation of invalid token");
            return;
        }
    };

    let Some(remaining) = claims.remaining_lifetime() else {
        return;
    };

    if !cache.set(&keys::blacklist(token), "revoked", remaining).await {
        tracing::warn!("Token revocation not recorded (cache unavailable)");
    }
}

/// Whether a token has been revoked
///
/// Answers `false` when the cache is unreachable.
pub async fn is_revoked(cache: &CacheClient, token: &str) -> bool {
    cache.exists(&keys::blacklist(token)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_create_and_validate_token() {
        let user_id = Uuid::new_v4();

        let token = create_token(user_id, SECRET, Duration::hours(24)).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, ISSUER);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();

        let result = validate_token(&token, "a-different-secret-of-sufficient-len");
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_validate_expired_token() {
        // Expired well past jsonwebtoken's default leeway.
        let token = create_token(Uuid::new_v4(), SECRET, Duration::hours(-2)).unwrap();

        let result = validate_token(&token, SECRET);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_validate_tampered_token() {
        let token = create_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');

        assert!(validate_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn test_remaining_lifetime() {
        let claims = Claims::new(Uuid::new_v4(), Duration::hours(1));
        let remaining = claims.remaining_lifetime().unwrap();
        assert!(remaining > 3500 && remaining <= 3600);

        let expired = Claims::new(Uuid::new_v4(), Duration::seconds(-10));
        assert_eq!(expired.remaining_lifetime(), None);
    }

    #[tokio::test]
    async fn test_revoke_with_cache_down_is_silent() {
        let cache = CacheClient::disconnected();
        let token = create_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();

        // Must not panic or error; revocation is best-effort.
        revoke_token(&cache, &token, SECRET).await;
        assert!(!is_revoked(&cache, &token).await);
    }

    #[tokio::test]
    async fn test_revoke_invalid_token_is_noop() {
        let cache = CacheClient::disconnected();
        revoke_token(&cache, "not-a-token", SECRET).await;
    }
}
