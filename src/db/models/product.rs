//! Product catalog models and queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::common::{now_timestamp, Patch};
use super::website::WebsiteSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub discount_percent: Option<f64>,
    pub discount_amount: Option<f64>,
    pub image: Option<String>,
    pub has_stock: bool,
    pub website_id: i64,
    pub status: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip)]
    pub deleted_at: Option<String>,
}

/// A product joined with its parent website.
///
/// `owner_id` is the website's owning user and drives the ownership check.
#[derive(Debug, Clone, FromRow)]
pub struct ProductWithWebsiteRow {
    #[sqlx(flatten)]
    pub product: Product,
    pub website_slug: String,
    pub website_name: String,
    pub owner_id: i64,
}

const PRODUCT_WITH_WEBSITE: &str = r#"
    SELECT p.*, w.slug AS website_slug, w.name AS website_name, w.user_id AS owner_id
    FROM products p
    INNER JOIN websites w ON w.id = p.website_id
"#;

impl ProductWithWebsiteRow {
    pub fn into_response(self) -> ProductWithWebsite {
        ProductWithWebsite {
            website: WebsiteSummary {
                id: self.product.website_id,
                slug: self.website_slug,
                name: self.website_name,
            },
            product: self.product,
        }
    }

    /// Live product by slug regardless of owner
    pub async fn find_by_slug(
        db: &SqlitePool,
        slug: &str,
    ) -> Result<Option<ProductWithWebsiteRow>, sqlx::Error> {
        let sql = format!(
            "{} WHERE p.slug = ? AND p.deleted_at IS NULL AND w.deleted_at IS NULL",
            PRODUCT_WITH_WEBSITE
        );
        sqlx::query_as(&sql).bind(slug).fetch_optional(db).await
    }

    /// Live products, restricted to websites owned by `owner` when given
    pub async fn list(
        db: &SqlitePool,
        owner: Option<i64>,
    ) -> Result<Vec<ProductWithWebsiteRow>, sqlx::Error> {
        let sql = format!(
            r#"{}
            WHERE p.deleted_at IS NULL AND w.deleted_at IS NULL AND (? IS NULL OR w.user_id = ?)
            ORDER BY p.created_at DESC, p.id DESC"#,
            PRODUCT_WITH_WEBSITE
        );
        sqlx::query_as(&sql)
            .bind(owner)
            .bind(owner)
            .fetch_all(db)
            .await
    }
}

impl Product {
    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM products WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_for_website(
        db: &SqlitePool,
        website_id: i64,
    ) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM products
            WHERE website_id = ? AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(website_id)
        .fetch_all(db)
        .await
    }

    /// Whether a live product other than `exclude_id` already uses `slug`
    pub async fn slug_taken(
        db: &SqlitePool,
        slug: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM products
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

    /// Soft-delete a product and its analytics in one transaction.
    pub async fn soft_delete_cascade(db: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        let now = now_timestamp();
        let mut tx = db.begin().await?;

        sqlx::query(
            "UPDATE analytics SET deleted_at = ? WHERE product_id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE products SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithWebsite {
    #[serde(flatten)]
    pub product: Product,
    pub website: WebsiteSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub website_id: Option<i64>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub discount_percent: Option<f64>,
    pub discount_amount: Option<f64>,
    pub image: Option<String>,
    pub has_stock: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub price: Patch<f64>,
    #[serde(default)]
    pub discount_percent: Patch<f64>,
    #[serde(default)]
    pub discount_amount: Patch<f64>,
    #[serde(default)]
    pub image: Patch<String>,
    #[serde(default)]
    pub has_stock: Patch<bool>,
    #[serde(default)]
    pub status: Patch<bool>,
}
