/// Authentication middleware
///
/// Resolves the caller's identity from a session token and attaches the
/// loaded user to request extensions. The per-request state machine:
///
/// 1. Extract the token from the `Authorization: Bearer` header, falling
///    back to the `token` cookie.
/// 2. Missing token → 401.
/// 3. Revoked token (logout blacklist) → 401.
/// 4. Validation failure → 401, distinguishing "Token expired" from
///    "Invalid token".
/// 5. User missing or deactivated → 401.
/// 6. Password changed after the token was issued → 401. No token may
///    authenticate a session against credentials it predates.
/// 7. Attach [`CurrentUser`] and continue.
///
/// [`optional_auth`] runs the same resolution but never fails the request;
/// an absent or invalid token simply leaves the identity unset.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use taskforge_shared::auth::jwt;
use taskforge_shared::models::user::User;

use crate::{app::AppState, error::ApiError};

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated user attached to request extensions
///
/// Handlers extract it with `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Pulls the session token from the Authorization header or the `token`
/// cookie. Header wins when both are present.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Required-authentication layer
///
/// Apply with `axum::middleware::from_fn_with_state(state, require_auth)`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(req.headers()).ok_or_else(|| {
        tracing::warn!("No token provided");
        ApiError::Unauthorized("Not authorized, no token".to_string())
    })?;

    let user = resolve_user(&state, &token).await?;

    tracing::debug!(user_id = %user.id, role = user.role.as_str(), "User authenticated");
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Optional-authentication layer
///
/// Same resolution as [`require_auth`], but failures leave the request
/// anonymous instead of rejecting it.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(req.headers()) {
        match resolve_user(&state, &token).await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "Optional auth: user authenticated");
                req.extensions_mut().insert(CurrentUser(user));
            }
            Err(e) => {
                tracing::debug!(error = %e, "Optional auth: token not accepted");
            }
        }
    }

    next.run(req).await
}

/// Token → user resolution shared by both layers
async fn resolve_user(state: &AppState, token: &str) -> Result<User, ApiError> {
    // A blacklist hit means an explicit logout; check before paying for
    // signature validation. Cache outage answers false: availability over
    // strict revocation.
    if jwt::is_revoked(&state.cache, token).await {
        tracing::warn!("Revoked token presented");
        return Err(ApiError::Unauthorized("Token revoked".to_string()));
    }

    let claims = jwt::validate_token(token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %claims.sub, "User not found for token");
            ApiError::Unauthorized("User not found".to_string())
        })?;

    if !user.is_active {
        tracing::warn!(user_id = %user.id, "Inactive user tried to authenticate");
        return Err(ApiError::Unauthorized(
            "User account is deactivated".to_string(),
        ));
    }

    if user.changed_password_after(claims.iat) {
        tracing::warn!(user_id = %user.id, "Token issued before password change");
        return Err(ApiError::Unauthorized(
            "User recently changed password. Please log in again.".to_string(),
        ));
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );

        assert_eq!(extract_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_token_rejects_non_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );

        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; token=abc.def.ghi"),
        );

        assert_eq!(extract_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("token=from-cookie"),
        );

        assert_eq!(extract_token(&headers), Some("from-header".to_string()));
    }

    #[test]
    fn test_extract_token_missing() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
