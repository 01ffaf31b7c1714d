/// Account operations: registration, login, logout, profile, password
///
/// User profiles are cached under `user:<id>` for an hour and invalidated
/// on every profile or password mutation. Password hashing and verification
/// run on the blocking pool: Argon2id is deliberately expensive and must
/// not stall the async executor.

use serde::Serialize;
use uuid::Uuid;

use taskforge_shared::auth::{jwt, password};
use taskforge_shared::cache::keys;
use taskforge_shared::models::user::{CreateUser, PublicUser, UpdateProfile, User, UserRole};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Cached user profiles live longer than task data; they change rarely.
const USER_CACHE_TTL: u64 = 3600;

/// Authenticated session payload returned by register and login
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: PublicUser,
    pub token: String,
}

/// Registers a new account and issues its first session token
///
/// # Errors
///
/// - `Conflict` when the email is already in use (checked up front, and
///   backstopped by the unique index for concurrent registrations)
pub async fn register(
    state: &AppState,
    name: String,
    email: String,
    plain_password: String,
    role: Option<UserRole>,
) -> ApiResult<AuthPayload> {
    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::Conflict("Email already in use".to_string()));
    }

    let password_hash = hash_on_blocking_pool(plain_password).await?;

    let user = User::create(
        &state.db,
        CreateUser {
            name,
            email,
            password_hash,
            role: role.unwrap_or_default(),
        },
    )
    .await?;

    let token = jwt::create_token(user.id, state.jwt_secret(), state.token_ttl())?;

    let public = user.to_public();
    state
        .cache
        .set_json(&keys::user(user.id), &public, USER_CACHE_TTL)
        .await;

    tracing::info!(user_id = %user.id, email = %user.email, role = user.role.as_str(), "New user registered");

    Ok(AuthPayload { user: public, token })
}

/// Authenticates a user by email and password
///
/// The same message is returned for an unknown email and a wrong password;
/// login must not reveal which accounts exist.
pub async fn login(state: &AppState, email: String, plain_password: String) -> ApiResult<AuthPayload> {
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Incorrect email or password".to_string()))?;

    let matches = verify_on_blocking_pool(plain_password, user.password_hash.clone()).await?;
    if !matches {
        return Err(ApiError::Unauthorized(
            "Incorrect email or password".to_string(),
        ));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let token = jwt::create_token(user.id, state.jwt_secret(), state.token_ttl())?;

    let public = user.to_public();
    state
        .cache
        .set_json(&keys::user(user.id), &public, USER_CACHE_TTL)
        .await;

    tracing::info!(user_id = %user.id, email = %user.email, "User logged in");

    Ok(AuthPayload { user: public, token })
}

/// Revokes the presented token
///
/// Best-effort: logout succeeds from the caller's perspective even when
/// the cache is down and the revocation cannot be recorded.
pub async fn logout(state: &AppState, token: &str) {
    jwt::revoke_token(&state.cache, token, state.jwt_secret()).await;
    tracing::info!("User logged out");
}

/// Current profile, read through the `user:<id>` cache
pub async fn current_user(state: &AppState, user_id: Uuid) -> ApiResult<PublicUser> {
    let cache_key = keys::user(user_id);

    if let Some(cached) = state.cache.get_json::<PublicUser>(&cache_key).await {
        return Ok(cached);
    }

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let public = user.to_public();
    state
        .cache
        .set_json(&cache_key, &public, USER_CACHE_TTL)
        .await;

    Ok(public)
}

/// Applies a partial profile update and invalidates the cached profile
pub async fn update_profile(
    state: &AppState,
    user_id: Uuid,
    update: UpdateProfile,
) -> ApiResult<PublicUser> {
    if update.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    // Moving to an email someone else holds is a conflict; re-submitting
    // your own is fine.
    if let Some(ref email) = update.email {
        if let Some(existing) = User::find_by_email(&state.db, email).await? {
            if existing.id != user_id {
                return Err(ApiError::Conflict("Email already in use".to_string()));
            }
        }
    }

    let user = User::update_profile(&state.db, user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    state.cache.del(&keys::user(user_id)).await;

    tracing::info!(user_id = %user.id, "User profile updated");

    Ok(user.to_public())
}

/// Verifies the current password, stores the new hash, and invalidates the
/// cached profile
///
/// Setting `password_changed_at` is what retires every token issued before
/// this moment; the authentication middleware enforces it.
pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    current_password: String,
    new_password: String,
) -> ApiResult<()> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let matches = verify_on_blocking_pool(current_password, user.password_hash.clone()).await?;
    if !matches {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = hash_on_blocking_pool(new_password).await?;
    User::update_password(&state.db, user_id, &password_hash).await?;

    state.cache.del(&keys::user(user_id)).await;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(())
}

async fn hash_on_blocking_pool(plain: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(ApiError::from)
}

async fn verify_on_blocking_pool(plain: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("Verification task failed: {}", e)))?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocking_pool_roundtrip() {
        let hash = hash_on_blocking_pool("secret-password".to_string())
            .await
            .unwrap();

        assert_ne!(hash, "secret-password");
        assert!(
            verify_on_blocking_pool("secret-password".to_string(), hash.clone())
                .await
                .unwrap()
        );
        assert!(
            !verify_on_blocking_pool("wrong".to_string(), hash)
                .await
                .unwrap()
        );
    }

    #[test]
    fn test_auth_payload_serialization() {
        // The payload nests the public user; credential material cannot
        // appear because PublicUser has none.
        use chrono::Utc;
        use taskforge_shared::models::user::{UserPreferences, UserProfile};

        let payload = AuthPayload {
            user: PublicUser {
                id: Uuid::new_v4(),
                name: "Test".to_string(),
                email: "test@example.com".to_string(),
                role: UserRole::User,
                is_active: true,
                last_login_at: None,
                profile: UserProfile::default(),
                preferences: UserPreferences::default(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            token: "a.b.c".to_string(),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["token"], "a.b.c");
        assert_eq!(json["user"]["email"], "test@example.com");
        assert!(json["user"].get("password_hash").is_none());
    }
}
