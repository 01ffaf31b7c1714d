/// User model and database operations
///
/// Passwords are stored as Argon2id hashes, never plaintext, and the hash
/// is excluded from every serialized view ([`PublicUser`]). Email
/// uniqueness is case-insensitive, enforced by a unique index on
/// `LOWER(email)`. Users are deactivated (`is_active = false`), never
/// physically deleted.
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::models::user::{CreateUser, User, UserRole};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     name: "Jane Doe".to_string(),
///     email: "jane@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::User,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "JANE@example.com").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Account role, used for route-level authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Manager,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

/// Postal address inside a user profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
}

/// Free-form profile document stored as JSONB
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

/// UI theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    Auto,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Auto
    }
}

/// Notification channel toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "default_true")]
    pub email: bool,
    #[serde(default = "default_true")]
    pub push: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self { email: true, push: true }
    }
}

/// Preference document stored as JSONB
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub notifications: NotificationPreferences,
}

/// User account row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,

    /// Stored as typed, compared case-insensitively
    pub email: String,

    /// Argon2id PHC string; never serialized or logged
    pub password_hash: String,

    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,

    /// Set (backdated one second) whenever the password changes; tokens
    /// issued before this instant are rejected at authentication
    pub password_changed_at: Option<DateTime<Utc>>,

    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,

    pub profile: Json<UserProfile>,
    pub preferences: Json<UserPreferences>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Serializable projection of a user without credential material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub profile: UserProfile,
    pub preferences: UserPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Projects the account into its public, credential-free view
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            profile: self.profile.0.clone(),
            preferences: self.preferences.0.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Whether the password changed after a token was issued
    ///
    /// `iat` is in Unix seconds, as carried by token claims.
    pub fn changed_password_after(&self, iat: i64) -> bool {
        match self.password_changed_at {
            Some(changed_at) => iat < changed_at.timestamp(),
            None => false,
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,

    /// Argon2id hash, not a plaintext password
    pub password_hash: String,

    pub role: UserRole,
}

/// Partial profile update; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile: Option<UserProfile>,
    pub preferences: Option<UserPreferences>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.profile.is_none()
            && self.preferences.is_none()
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, is_active, last_login_at, \
     password_changed_at, password_reset_token, password_reset_expires, \
     profile, preferences, created_at, updated_at";

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a database error on connection failure or when the email is
    /// already taken (unique index on `LOWER(email)`); callers map the
    /// latter to a conflict.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by email, case-insensitively
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)",
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Applies a partial profile update
    ///
    /// Builds the UPDATE dynamically from the fields present; `updated_at`
    /// always advances.
    ///
    /// # Returns
    ///
    /// The updated user, or `None` if the user does not exist.
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.profile.is_some() {
            bind_count += 1;
            query.push_str(&format!(", profile = ${}", bind_count));
        }
        if data.preferences.is_some() {
            bind_count += 1;
            query.push_str(&format!(", preferences = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(profile) = data.profile {
            q = q.bind(Json(profile));
        }
        if let Some(preferences) = data.preferences {
            q = q.bind(Json(preferences));
        }

        q.fetch_optional(pool).await
    }

    /// Replaces the password hash and stamps the change time
    ///
    /// The change timestamp is backdated one second: token `iat` values are
    /// truncated to whole seconds, so a token minted in the same second as
    /// the change would otherwise be spuriously rejected.
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = NOW() - INTERVAL '1 second',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stamps the last-login time after successful authentication
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "$argon2id$hash".to_string(),
            role: UserRole::User,
            is_active: true,
            last_login_at: None,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            profile: Json(UserProfile::default()),
            preferences: Json(UserPreferences::default()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_changed_password_after() {
        let mut user = sample_user();
        let now = Utc::now();

        // Never changed: any token is fine.
        assert!(!user.changed_password_after(now.timestamp()));

        // Changed an hour ago: older tokens rejected, newer accepted.
        user.password_changed_at = Some(now - Duration::hours(1));
        let before_change = (now - Duration::hours(2)).timestamp();
        let after_change = now.timestamp();
        assert!(user.changed_password_after(before_change));
        assert!(!user.changed_password_after(after_change));
    }

    #[test]
    fn test_public_user_has_no_credential_material() {
        let user = sample_user();
        let public = user.to_public();

        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password_reset_token").is_none());
        assert_eq!(json["email"], "test@example.com");
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), r#""admin""#);
        assert_eq!(serde_json::to_string(&UserRole::Manager).unwrap(), r#""manager""#);
        assert_eq!(
            serde_json::from_str::<UserRole>(r#""user""#).unwrap(),
            UserRole::User
        );
    }

    #[test]
    fn test_preferences_defaults() {
        let prefs: UserPreferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs.theme, Theme::Auto);
        assert!(prefs.notifications.email);
        assert!(prefs.notifications.push);
    }

    #[test]
    fn test_update_profile_is_empty() {
        assert!(UpdateProfile::default().is_empty());
        assert!(!UpdateProfile {
            name: Some("New Name".to_string()),
            ..Default::default()
        }
        .is_empty());
    }
}
