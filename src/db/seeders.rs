//! Database seeders for built-in data
//!
//! Runs on every startup and only writes when the data is missing.

use anyhow::{Context, Result};
use rand::Rng;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::models::{now_timestamp, User, UserRole};
use crate::api::auth::hash_password;

/// Make sure at least one live admin account exists.
///
/// When `password` is `None` a random one is generated and logged once.
/// Returns the id of the created admin, or `None` if nothing was seeded.
pub async fn ensure_admin_user(
    pool: &SqlitePool,
    username: &str,
    password: Option<&str>,
) -> Result<Option<i64>> {
    let admins: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE level_role = ? AND deleted_at IS NULL",
    )
    .bind(UserRole::Admin.level())
    .fetch_one(pool)
    .await?;

    if admins > 0 {
        return Ok(None);
    }

    if User::find_by_username(pool, username).await?.is_some() {
        warn!(
            username,
            "No admin account exists and the configured admin username is taken by a standard user; skipping seed"
        );
        return Ok(None);
    }

    let generated;
    let password = match password {
        Some(p) => p,
        None => {
            let bytes: [u8; 12] = rand::rng().random();
            generated = hex::encode(bytes);
            warn!(
                username,
                password = %generated,
                "Generated initial admin password; set auth.admin_password to choose your own"
            );
            generated.as_str()
        }
    };

    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    let now = now_timestamp();

    let id = sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, status, level_role, created_at, updated_at)
        VALUES (?, ?, 1, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(&password_hash)
    .bind(UserRole::Admin.level())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .context("Failed to create admin user")?
    .last_insert_rowid();

    info!(username, id, "Created initial admin user");
    Ok(Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::verify_password;

    #[tokio::test]
    async fn test_seeds_admin_once() {
        let pool = crate::db::init("sqlite::memory:", 1).await.unwrap();

        let id = ensure_admin_user(&pool, "admin", Some("secret123"))
            .await
            .unwrap()
            .expect("admin should be created");

        let user = User::find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(user.role(), UserRole::Admin);
        assert!(user.status);
        assert!(verify_password("secret123", &user.password_hash));

        let again = ensure_admin_user(&pool, "admin", Some("other")).await.unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_generates_password_when_unset() {
        let pool = crate::db::init("sqlite::memory:", 1).await.unwrap();

        let id = ensure_admin_user(&pool, "root", None).await.unwrap().unwrap();
        let user = User::find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(user.username, "root");
        assert!(user.password_hash.starts_with("$argon2"));
    }
}
