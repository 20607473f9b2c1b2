//! User models and queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::{now_timestamp, Patch};

/// Account role. Stored and serialized as its numeric level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum UserRole {
    /// Unrestricted access to every website, product and user
    Admin,
    /// Access limited to the websites the user owns
    Standard,
}

impl UserRole {
    pub fn level(&self) -> i64 {
        match self {
            UserRole::Admin => 0,
            UserRole::Standard => 1,
        }
    }
}

impl TryFrom<i64> for UserRole {
    type Error = String;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(UserRole::Admin),
            1 => Ok(UserRole::Standard),
            _ => Err(format!("Unknown role level: {} (expected 0 or 1)", level)),
        }
    }
}

impl From<UserRole> for i64 {
    fn from(role: UserRole) -> Self {
        role.level()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Standard => write!(f, "standard"),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub status: bool,
    pub level_role: i64,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl User {
    /// Role of this user; unknown levels fall back to the least privileged role.
    pub fn role(&self) -> UserRole {
        UserRole::try_from(self.level_role).unwrap_or(UserRole::Standard)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_username(
        db: &SqlitePool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE username = ? AND deleted_at IS NULL")
            .bind(username)
            .fetch_optional(db)
            .await
    }

    /// Whether a live user other than `exclude_id` already uses `username`
    pub async fn username_taken(
        db: &SqlitePool,
        username: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE username = ? AND deleted_at IS NULL AND (? IS NULL OR id != ?)
            "#,
        )
        .bind(username)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(db)
        .await?;
        Ok(count > 0)
    }

    /// Soft-delete a user together with everything it owns, in one transaction.
    pub async fn soft_delete_cascade(db: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        let now = now_timestamp();
        let mut tx = db.begin().await?;

        sqlx::query(
            r#"
            UPDATE analytics SET deleted_at = ?
            WHERE deleted_at IS NULL
              AND website_id IN (SELECT id FROM websites WHERE user_id = ?)
            "#,
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE products SET deleted_at = ?
            WHERE deleted_at IS NULL
              AND website_id IN (SELECT id FROM websites WHERE user_id = ?)
            "#,
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE websites SET deleted_at = ? WHERE user_id = ? AND deleted_at IS NULL")
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }
}

/// User payload returned by the API (never includes the password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub status: bool,
    pub level_role: UserRole,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            level_role: user.role(),
            username: user.username,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Short website entry embedded in user admin responses
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserWebsiteSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub url: String,
    pub logo: Option<String>,
    pub status: bool,
}

impl UserWebsiteSummary {
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<UserWebsiteSummary>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, name, slug, url, logo, status FROM websites
            WHERE user_id = ? AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithWebsites {
    #[serde(flatten)]
    pub user: UserResponse,
    pub websites: Vec<UserWebsiteSummary>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub username: String,
    pub status: bool,
    pub level_role: UserRole,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub status: Option<bool>,
    pub level_role: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Patch<String>,
    #[serde(default)]
    pub password: Patch<String>,
    #[serde(default)]
    pub status: Patch<bool>,
    #[serde(default)]
    pub level_role: Patch<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserWithWebsites>,
    pub pagination: super::common::Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_levels() {
        assert_eq!(UserRole::try_from(0).unwrap(), UserRole::Admin);
        assert_eq!(UserRole::try_from(1).unwrap(), UserRole::Standard);
        assert!(UserRole::try_from(2).is_err());
        assert_eq!(i64::from(UserRole::Admin), 0);
    }

    #[test]
    fn test_role_serializes_as_number() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "0");
        let role: UserRole = serde_json::from_str("1").unwrap();
        assert_eq!(role, UserRole::Standard);
        assert!(serde_json::from_str::<UserRole>("7").is_err());
    }

    #[test]
    fn test_user_response_hides_hash() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            status: true,
            level_role: 1,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            deleted_at: None,
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(json["levelRole"], 1);
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_update_request_distinguishes_absent_password() {
        let req: UpdateUserRequest = serde_json::from_str(r#"{"status": false}"#).unwrap();
        assert!(req.password.is_missing());
        assert_eq!(req.status, Patch::Value(false));
    }
}
