//! Website (storefront) models and queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::{now_timestamp, Patch};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub phone: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub logo: Option<String>,
    pub user_id: i64,
    pub url: String,
    pub status: bool,
    pub can_access: bool,
    pub description: Option<String>,
    pub subdomain: Option<String>,
    pub can_expired: bool,
    pub has_product: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip)]
    pub deleted_at: Option<String>,
}

impl Website {
    /// Look up a live website by slug, restricted to `owner` when given.
    pub async fn find_by_slug(
        db: &SqlitePool,
        slug: &str,
        owner: Option<i64>,
    ) -> Result<Option<Website>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM websites
            WHERE slug = ? AND deleted_at IS NULL AND (? IS NULL OR user_id = ?)
            "#,
        )
        .bind(slug)
        .bind(owner)
        .bind(owner)
        .fetch_optional(db)
        .await
    }

    /// Look up a live website by id, restricted to `owner` when given.
    pub async fn find_by_id(
        db: &SqlitePool,
        id: i64,
        owner: Option<i64>,
    ) -> Result<Option<Website>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM websites
            WHERE id = ? AND deleted_at IS NULL AND (? IS NULL OR user_id = ?)
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(owner)
        .fetch_optional(db)
        .await
    }

    pub async fn list(db: &SqlitePool, owner: Option<i64>) -> Result<Vec<Website>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM websites
            WHERE deleted_at IS NULL AND (? IS NULL OR user_id = ?)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner)
        .bind(owner)
        .fetch_all(db)
        .await
    }

    /// Whether a live website other than `exclude_id` already uses `slug`
    pub async fn slug_taken(
        db: &SqlitePool,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM websites
            WHERE slug = ? AND deleted_at IS NULL AND (? IS NULL OR id != ?)
            "#,
        )
        .bind(slug)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(db)
        .await?;
        Ok(count > 0)
    }

    /// Soft-delete a website with its products and analytics in one transaction.
    pub async fn soft_delete_cascade(db: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        let now = now_timestamp();
        let mut tx = db.begin().await?;

        sqlx::query(
            "UPDATE analytics SET deleted_at = ? WHERE website_id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE products SET deleted_at = ? WHERE website_id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE websites SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }
}

/// Website summary embedded in product responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteSummary {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// Website payload for unauthenticated readers; omits the owner
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicWebsite {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub phone: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub logo: Option<String>,
    pub url: String,
    pub status: bool,
    pub can_access: bool,
    pub description: Option<String>,
    pub subdomain: Option<String>,
    pub can_expired: bool,
    pub has_product: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Website> for PublicWebsite {
    fn from(w: Website) -> Self {
        Self {
            id: w.id,
            slug: w.slug,
            name: w.name,
            phone: w.phone,
            lat: w.lat,
            lng: w.lng,
            address: w.address,
            logo: w.logo,
            url: w.url,
            status: w.status,
            can_access: w.can_access,
            description: w.description,
            subdomain: w.subdomain,
            can_expired: w.can_expired,
            has_product: w.has_product,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebsiteRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub phone: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub logo: Option<String>,
    pub description: Option<String>,
    pub subdomain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWebsiteRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub url: Patch<String>,
    #[serde(default)]
    pub phone: Patch<String>,
    #[serde(default)]
    pub lat: Patch<f64>,
    #[serde(default)]
    pub lng: Patch<f64>,
    #[serde(default)]
    pub address: Patch<String>,
    #[serde(default)]
    pub logo: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub subdomain: Patch<String>,
    #[serde(default)]
    pub status: Patch<bool>,
    #[serde(default)]
    pub can_access: Patch<bool>,
    #[serde(default)]
    pub can_expired: Patch<bool>,
    #[serde(default)]
    pub has_product: Patch<bool>,
}
