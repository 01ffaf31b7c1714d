/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST  /api/v1/auth/register` - create an account, returns user + token
/// - `POST  /api/v1/auth/login` - authenticate, returns user + token
/// - `POST  /api/v1/auth/logout` - revoke the presented token
/// - `GET   /api/v1/auth/me` - current profile
/// - `PATCH /api/v1/auth/update-profile` - partial profile update
/// - `PATCH /api/v1/auth/change-password` - rotate the password
///
/// Tokens travel as `Authorization: Bearer` headers; in production, login
/// additionally sets an HttpOnly `token` cookie (Secure, SameSite=Strict,
/// one day) and logout clears it.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use validator::Validate;

use taskforge_shared::models::user::{
    PublicUser, UpdateProfile, UserPreferences, UserProfile, UserRole,
};

use crate::{
    app::AppState,
    error::ApiResult,
    middleware::auth::{extract_token, CurrentUser, TOKEN_COOKIE},
    response::ApiResponse,
    services,
};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be 2-50 characters"))]
    pub name: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,

    /// Optional role; defaults to `user`
    pub role: Option<UserRole>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Profile update request; all fields optional
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be 2-50 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,

    pub profile: Option<UserProfile>,
    pub preferences: Option<UserPreferences>,
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,

    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_new_password: String,
}

/// `{ "user": ... }` payload wrapper
#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: PublicUser,
}

/// Registers a new user
///
/// # Errors
///
/// - `400` validation failure
/// - `409` email already in use
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let payload =
        services::users::register(&state, req.name, req.email, req.password, req.role).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "User registered successfully",
            payload,
        )),
    ))
}

/// Authenticates a user and issues a session token
///
/// # Errors
///
/// - `400` validation failure
/// - `401` wrong credentials or deactivated account
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let payload = services::users::login(&state, req.email, req.password).await?;

    // Cookie transport only in production; development clients use the
    // Authorization header.
    let jar = if state.config.api.production {
        jar.add(session_cookie(payload.token.clone()))
    } else {
        jar
    };

    Ok((
        jar,
        Json(ApiResponse::with_message("Logged in successfully", payload)),
    ))
}

/// Revokes the presented token and clears the session cookie
///
/// Succeeds even when the revocation cannot be recorded.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(token) = extract_token(&headers) {
        services::users::logout(&state, &token).await;
    }

    let mut removal = Cookie::from(TOKEN_COOKIE);
    removal.set_path("/");
    let jar = jar.remove(removal);

    Ok((jar, Json(ApiResponse::message("Logged out successfully"))))
}

/// Current user's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<UserEnvelope>>> {
    let user = services::users::current_user(&state, user.id).await?;

    Ok(Json(ApiResponse::data(UserEnvelope { user })))
}

/// Partial profile update
///
/// # Errors
///
/// - `400` validation failure or empty update
/// - `409` email already in use by another account
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<UserEnvelope>>> {
    req.validate()?;

    let updated = services::users::update_profile(
        &state,
        user.id,
        UpdateProfile {
            name: req.name,
            email: req.email,
            profile: req.profile,
            preferences: req.preferences,
        },
    )
    .await?;

    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        UserEnvelope { user: updated },
    )))
}

/// Rotates the caller's password
///
/// Every token issued before the change stops authenticating.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    req.validate()?;

    services::users::change_password(&state, user.id, req.current_password, req.new_password)
        .await?;

    Ok(Json(ApiResponse::message("Password changed successfully")))
}

/// Session cookie: HttpOnly, Secure, SameSite=Strict, one day
fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(cookie::time::Duration::days(1))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_register() -> RegisterRequest {
        RegisterRequest {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            password: "longenough".to_string(),
            confirm_password: "longenough".to_string(),
            role: None,
        }
    }

    #[test]
    fn test_register_validation_passes() {
        assert!(valid_register().validate().is_ok());
    }

    #[test]
    fn test_register_rejects_bad_email() {
        let mut req = valid_register();
        req.email = "not-an-email".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_rejects_short_password() {
        let mut req = valid_register();
        req.password = "short".to_string();
        req.confirm_password = "short".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_rejects_mismatched_confirmation() {
        let mut req = valid_register();
        req.confirm_password = "different-password".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_rejects_short_name() {
        let mut req = valid_register();
        req.name = "J".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_change_password_confirmation() {
        let req = ChangePasswordRequest {
            current_password: "old-password".to_string(),
            new_password: "new-password".to_string(),
            confirm_new_password: "new-password".to_string(),
        };
        assert!(req.validate().is_ok());

        let req = ChangePasswordRequest {
            current_password: "old-password".to_string(),
            new_password: "new-password".to_string(),
            confirm_new_password: "other".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc.def.ghi".to_string());

        assert_eq!(cookie.name(), TOKEN_COOKIE);
        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
    }
}
